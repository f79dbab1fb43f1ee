pub mod test_helpers {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use crate::document::{DocumentLoader, PdfDocument, PdfPage, Raster};
    use crate::embed::{LinkResolver, RenderPlan, Viewport};
    use crate::output::RasterSink;
    use crate::vault::FileReader;

    /// US Letter in points
    pub const LETTER: Viewport = Viewport::new(612.0, 792.0);

    /// Bytes the fake loader accepts as a document with `pages` pages of `size`.
    #[must_use]
    pub fn fake_pdf(pages: usize, size: Viewport) -> Vec<u8> {
        format!("FAKEPDF {pages} {} {}", size.width, size.height).into_bytes()
    }

    /// In-memory vault, files keyed by vault-relative path
    #[derive(Default)]
    pub struct FakeVault {
        files: HashMap<String, Vec<u8>>,
        reads: RefCell<Vec<String>>,
    }

    impl FakeVault {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a file
        pub fn with_file(mut self, path: &str, bytes: Vec<u8>) -> Self {
            self.files.insert(path.to_string(), bytes);
            self
        }

        /// Add a fake PDF
        pub fn with_pdf(self, path: &str, pages: usize) -> Self {
            self.with_file(path, fake_pdf(pages, LETTER))
        }

        /// Paths read so far, in order
        pub fn reads(&self) -> Vec<String> {
            self.reads.borrow().clone()
        }
    }

    impl FileReader for FakeVault {
        fn read_binary(&self, path: &str) -> anyhow::Result<Vec<u8>> {
            self.reads.borrow_mut().push(path.to_string());
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no such file"))
        }
    }

    impl LinkResolver for FakeVault {
        fn resolve_link_path(&self, link: &str, _source_folder: &str) -> Option<String> {
            let suffix = format!("/{link}");
            let mut matches: Vec<&String> = self
                .files
                .keys()
                .filter(|p| p.as_str() == link || p.ends_with(&suffix))
                .collect();
            matches.sort();
            matches.first().map(|p| (*p).clone())
        }
    }

    /// Decodes [`fake_pdf`] bytes and records what gets rendered
    #[derive(Default)]
    pub struct FakeLoader {
        loads: Cell<usize>,
        rendered: Rc<RefCell<Vec<usize>>>,
    }

    impl FakeLoader {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of documents decoded
        pub fn loads(&self) -> usize {
            self.loads.get()
        }

        /// Page numbers rendered, across all documents, in order
        pub fn rendered(&self) -> Vec<usize> {
            self.rendered.borrow().clone()
        }
    }

    impl DocumentLoader for FakeLoader {
        fn load(&self, bytes: Vec<u8>) -> anyhow::Result<Rc<dyn PdfDocument>> {
            self.loads.set(self.loads.get() + 1);
            let text = String::from_utf8(bytes)?;
            let mut parts = text.split_whitespace();
            if parts.next() != Some("FAKEPDF") {
                anyhow::bail!("no header found");
            }
            let mut next = || parts.next().ok_or_else(|| anyhow::anyhow!("truncated header"));
            let pages: usize = next()?.parse()?;
            let width: f64 = next()?.parse()?;
            let height: f64 = next()?.parse()?;
            Ok(Rc::new(FakeDocument {
                pages,
                size: Viewport::new(width, height),
                rendered: Rc::clone(&self.rendered),
            }))
        }
    }

    pub struct FakeDocument {
        pages: usize,
        size: Viewport,
        rendered: Rc<RefCell<Vec<usize>>>,
    }

    impl PdfDocument for FakeDocument {
        fn page_count(&self) -> anyhow::Result<usize> {
            Ok(self.pages)
        }

        fn page(&self, number: usize) -> anyhow::Result<Box<dyn PdfPage + '_>> {
            if number == 0 || number > self.pages {
                anyhow::bail!("Invalid page request");
            }
            Ok(Box::new(FakePage {
                number,
                doc: self,
            }))
        }
    }

    struct FakePage<'a> {
        number: usize,
        doc: &'a FakeDocument,
    }

    impl PdfPage for FakePage<'_> {
        fn page_size(&self) -> anyhow::Result<Viewport> {
            Ok(self.doc.size)
        }

        fn render(&self, plan: &RenderPlan) -> anyhow::Result<Raster> {
            self.doc.rendered.borrow_mut().push(self.number);
            Raster::blank(plan.output_width, plan.output_height)
        }
    }

    /// Keeps plans instead of writing files
    #[derive(Default)]
    pub struct MemorySink {
        pub stored: Vec<RenderPlan>,
        pub fail: bool,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sink whose every store fails
        pub fn failing() -> Self {
            Self {
                stored: Vec::new(),
                fail: true,
            }
        }
    }

    impl RasterSink for MemorySink {
        fn store(&mut self, plan: &RenderPlan, raster: &Raster) -> anyhow::Result<String> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            assert_eq!(
                (raster.width, raster.height),
                (plan.output_width, plan.output_height)
            );
            self.stored.push(plan.clone());
            Ok(format!("assets/p{}-{}.png", plan.page_number, plan.index))
        }
    }
}
