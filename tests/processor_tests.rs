use pdfembed::EmbedError;
use pdfembed::embed::SourceContext;
use pdfembed::processor::{BlockProcessor, NoteStats, PageOutcome, PagePlan, RenderContext};
use pdfembed::settings::Settings;
use pdfembed::test_utils::test_helpers::{FakeLoader, FakeVault, MemorySink};

fn settings(fit: bool, link: bool) -> Settings {
    Settings {
        fit_by_default: fit,
        link_by_default: link,
        ..Settings::default()
    }
}

fn context<'a>(
    settings: &'a Settings,
    vault: &'a FakeVault,
    loader: &'a FakeLoader,
    display_width: u32,
) -> RenderContext<'a> {
    RenderContext {
        settings,
        files: vault,
        links: vault,
        loader,
        display_width,
    }
}

fn note_source() -> SourceContext {
    SourceContext::new("notes/today.md")
}

#[test]
fn renders_pages_in_requested_order() {
    let vault = FakeVault::new().with_pdf("papers/a.pdf", 10);
    let loader = FakeLoader::new();
    let settings = settings(false, true);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));
    let mut sink = MemorySink::new();

    let note = "Intro\n\n```pdf\n{\"url\": \"papers/a.pdf\", \"page\": [7, [2, 3], 7]}\n```\n";
    let (rendered, stats) = processor.process_note(note, &note_source(), &mut sink);

    assert_eq!(loader.rendered(), vec![7, 2, 3, 7]);
    let pages: Vec<usize> = sink.stored.iter().map(|p| p.page_number).collect();
    assert_eq!(pages, vec![7, 2, 3, 7]);
    assert_eq!(
        stats,
        NoteStats {
            blocks: 1,
            failed_blocks: 0,
            pages: 4,
            failed_pages: 0,
        }
    );

    assert!(rendered.starts_with("Intro\n\n<!-- pdfembed-begin\n"));
    assert!(rendered.contains(
        "<a class=\"internal-link\" href=\"papers/a.pdf#page=7\"><img src=\"../assets/p7-0.png\" alt=\"page 7\" width=\"612\" height=\"792\"></a>"
    ));
    let first = rendered.find("href=\"papers/a.pdf#page=2\"").unwrap();
    let second = rendered.find("href=\"papers/a.pdf#page=3\"").unwrap();
    assert!(first < second);
}

#[test]
fn page_past_the_end_fails_alone() {
    let vault = FakeVault::new().with_pdf("a.pdf", 3);
    let loader = FakeLoader::new();
    let settings = settings(false, false);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));
    let mut sink = MemorySink::new();

    let note = "```pdf\n{\"url\": \"a.pdf\", \"page\": [1, 9, 3]}\n```\n\nAfter the block.\n";
    let (rendered, stats) = processor.process_note(note, &SourceContext::new("index.md"), &mut sink);

    assert_eq!(loader.rendered(), vec![1, 3]);
    assert_eq!(stats.pages, 3);
    assert_eq!(stats.failed_pages, 1);
    assert_eq!(stats.failed_blocks, 0);
    assert!(rendered.contains(
        "<h2 class=\"pdf-embed-error\">Unable to render page 9 of a.pdf: Invalid page request</h2>"
    ));
    assert!(rendered.contains("alt=\"page 1\""));
    assert!(rendered.contains("alt=\"page 3\""));
    assert!(rendered.ends_with("\n\nAfter the block.\n"));
}

#[test]
fn outcomes_keep_failed_slot_in_place() {
    let vault = FakeVault::new().with_pdf("a.pdf", 2);
    let loader = FakeLoader::new();
    let settings = settings(false, false);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));

    let block = processor
        .resolve("{\"url\": \"a.pdf\", \"page\": [2, 5, 1]}", &note_source())
        .unwrap();
    let outcomes = processor.render_block(&block);

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(&outcomes[0], PageOutcome::Rendered { plan, .. } if plan.page_number == 2));
    assert!(matches!(
        &outcomes[1],
        PageOutcome::Failed {
            page: 5,
            error: EmbedError::PageFetch { .. }
        }
    ));
    assert!(matches!(&outcomes[2], PageOutcome::Rendered { plan, .. } if plan.index == 2));
}

#[test]
fn broken_block_does_not_stop_the_note() {
    let vault = FakeVault::new().with_pdf("a.pdf", 2);
    let loader = FakeLoader::new();
    let settings = settings(false, false);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));
    let mut sink = MemorySink::new();

    let note = "```pdf\n{\"url\": \"a.pdf\",, }\n```\n\n```pdf\n{\"url\": \"a.pdf\"}\n```\n";
    let (rendered, stats) = processor.process_note(note, &note_source(), &mut sink);

    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.failed_blocks, 1);
    assert_eq!(sink.stored.len(), 1);
    assert!(rendered.contains("<h2 class=\"pdf-embed-error\">PDF Parameters invalid: "));
    assert!(rendered.contains("alt=\"page 1\""));
}

#[test]
fn missing_url_is_a_parameter_error() {
    let vault = FakeVault::new();
    let loader = FakeLoader::new();
    let settings = Settings::default();
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));

    let err = processor
        .resolve("{\"page\": 2}", &note_source())
        .err()
        .unwrap();
    assert_eq!(err, EmbedError::syntax("missing required \"url\" string"));
}

#[test]
fn bare_wikilink_resolves_through_vault() {
    let vault = FakeVault::new().with_pdf("attachments/My File.pdf", 4);
    let loader = FakeLoader::new();
    let settings = settings(false, true);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));
    let mut sink = MemorySink::new();

    let note = "```pdf\n{\"url\": [[My File.pdf]], \"page\": 2}\n```\n";
    let (rendered, _) = processor.process_note(note, &note_source(), &mut sink);

    assert_eq!(vault.reads(), vec!["attachments/My File.pdf".to_string()]);
    assert!(rendered.contains("href=\"attachments/My File.pdf#page=2\""));
}

#[test]
fn unresolved_link_is_reported_inline() {
    let vault = FakeVault::new();
    let loader = FakeLoader::new();
    let settings = Settings::default();
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));
    let mut sink = MemorySink::new();

    let note = "```pdf\n{\"url\": \"[[Ghost.pdf]]\"}\n```\n";
    let (rendered, stats) = processor.process_note(note, &note_source(), &mut sink);

    assert_eq!(stats.failed_blocks, 1);
    assert!(rendered.contains("Unable to resolve link: [[Ghost.pdf]]"));
    assert!(vault.reads().is_empty());
}

#[test]
fn relative_url_reads_next_to_the_note() {
    let vault = FakeVault::new().with_pdf("notes/sub/doc.pdf", 1);
    let loader = FakeLoader::new();
    let settings = Settings::default();
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));

    let block = processor
        .resolve("{\"url\": \"./sub/doc.pdf\"}", &note_source())
        .unwrap();
    assert_eq!(block.reference.path, "notes/sub/doc.pdf");
}

#[test]
fn unreadable_and_undecodable_files() {
    let vault = FakeVault::new().with_file("junk.pdf", b"<html>".to_vec());
    let loader = FakeLoader::new();
    let settings = Settings::default();
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));

    let missing = processor
        .resolve("{\"url\": \"nope.pdf\"}", &note_source())
        .err()
        .unwrap();
    assert_eq!(
        missing,
        EmbedError::FileRead {
            path: "nope.pdf".into(),
            detail: "no such file".into(),
        }
    );

    let junk = processor
        .resolve("{\"url\": \"junk.pdf\"}", &note_source())
        .err()
        .unwrap();
    assert!(matches!(junk, EmbedError::Decode { ref path, .. } if path == "junk.pdf"));
}

#[test]
fn zero_renders_whole_document() {
    let vault = FakeVault::new().with_pdf("a.pdf", 7);
    let loader = FakeLoader::new();
    let settings = Settings::default();
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));

    let block = processor
        .resolve("{\"url\": \"a.pdf\", \"page\": [1, 0, 5]}", &note_source())
        .unwrap();
    assert_eq!(block.pages, vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn same_document_is_decoded_once_per_pass() {
    let vault = FakeVault::new().with_pdf("a.pdf", 3);
    let loader = FakeLoader::new();
    let settings = settings(false, false);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));
    let mut sink = MemorySink::new();

    let note = "```pdf\n{\"url\": \"a.pdf\", \"page\": 1}\n```\n\n```pdf\n{\"url\": \"a.pdf\", \"page\": 3}\n```\n";
    let (_, stats) = processor.process_note(note, &note_source(), &mut sink);

    assert_eq!(stats.pages, 2);
    assert_eq!(loader.loads(), 1);
    assert_eq!(vault.reads().len(), 1);
}

#[test]
fn fit_pages_render_at_display_width() {
    let vault = FakeVault::new().with_pdf("a.pdf", 1);
    let loader = FakeLoader::new();
    let settings = settings(true, false);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 306));
    let mut sink = MemorySink::new();

    let note = "```pdf\n{\"url\": \"a.pdf\"}\n```\n";
    let (rendered, _) = processor.process_note(note, &SourceContext::new("index.md"), &mut sink);

    let plan = &sink.stored[0];
    assert_eq!(plan.viewport_scale, 0.5);
    assert_eq!((plan.output_width, plan.output_height), (306, 396));
    assert!(rendered.contains("<img src=\"assets/p1-0.png\" alt=\"page 1\" style=\"width: 100%\">"));
}

#[test]
fn block_options_override_settings_snapshot() {
    let vault = FakeVault::new().with_pdf("a.pdf", 1);
    let loader = FakeLoader::new();
    let settings = settings(true, true);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 306));
    let mut sink = MemorySink::new();

    let note = "```pdf\n{\"url\": \"a.pdf\", \"fit\": false, \"link\": false, \"scale\": 2}\n```\n";
    let (rendered, _) = processor.process_note(note, &SourceContext::new("index.md"), &mut sink);

    assert!(!rendered.contains("<a "));
    assert!(rendered.contains("width=\"1224\" height=\"1584\""));
}

#[test]
fn crop_plan_through_processor() {
    let vault = FakeVault::new().with_pdf("a.pdf", 1);
    let loader = FakeLoader::new();
    let settings = settings(false, false);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));

    let block = processor
        .resolve(
            "{\"url\": \"a.pdf\", \"scale\": 2, \"rect\": [10, 20, 0, 0]}",
            &note_source(),
        )
        .unwrap();
    let plans = processor.plan_block(&block);
    let [PagePlan::Planned(plan)] = plans.as_slice() else {
        panic!("expected one planned page, got {plans:?}");
    };
    assert_eq!((plan.offset_x, plan.offset_y), (-20, -40));
    assert_eq!((plan.output_width, plan.output_height), (1224, 1584));
}

#[test]
fn store_failure_is_reported_per_page() {
    let vault = FakeVault::new().with_pdf("a.pdf", 2);
    let loader = FakeLoader::new();
    let settings = settings(false, false);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));
    let mut sink = MemorySink::failing();

    let note = "```pdf\n{\"url\": \"a.pdf\", \"range\": [1, 2]}\n```\n";
    let (rendered, stats) = processor.process_note(note, &note_source(), &mut sink);

    assert_eq!(stats.failed_pages, 2);
    assert!(rendered.contains("Unable to save page 1 of a.pdf: disk full"));
    assert!(rendered.contains("Unable to save page 2 of a.pdf: disk full"));
}

#[test]
fn rerendering_a_note_is_stable() {
    let vault = FakeVault::new().with_pdf("a.pdf", 2);
    let loader = FakeLoader::new();
    let settings = settings(false, true);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));
    let mut sink = MemorySink::new();

    let note = "# Title\n\n```pdf\n{\"url\": \"a.pdf\", \"page\": 2}\n```\n";
    let (first, _) = processor.process_note(note, &note_source(), &mut sink);
    let (second, stats) = processor.process_note(&first, &note_source(), &mut sink);

    assert_eq!(stats.blocks, 1);
    assert_eq!(first, second);
}

#[test]
fn oversized_output_fails_only_its_page() {
    let vault = FakeVault::new().with_pdf("a.pdf", 2);
    let loader = FakeLoader::new();
    let settings = settings(false, false);
    let mut processor = BlockProcessor::new(context(&settings, &vault, &loader, 800));
    let mut sink = MemorySink::new();

    let note = "```pdf\n{\"url\": \"a.pdf\", \"scale\": 10, \"rect\": [0, 0, 100000, 100000]}\n```\n\n```pdf\n{\"url\": \"a.pdf\", \"page\": 2}\n```\n\nEnd.\n";
    let (rendered, stats) = processor.process_note(note, &note_source(), &mut sink);

    assert_eq!(loader.rendered(), vec![2]);
    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.failed_blocks, 0);
    assert_eq!(stats.failed_pages, 1);
    assert!(rendered.contains(
        "Unable to render page 1 of a.pdf: 1000000x1000000 output exceeds the limit of 67108864 pixels"
    ));
    assert!(rendered.contains("alt=\"page 2\""));
    assert!(rendered.ends_with("\n\nEnd.\n"));
}
