//! Request fixtures shared by the decoder benchmarks.

/// A raw HTTP request loaded from `resources/request`
#[derive(Debug, Copy, Clone)]
pub struct RequestFixture {
    file_name: &'static str,
    content: &'static str,
}

impl RequestFixture {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    pub fn content(&self) -> &'static [u8] {
        self.content.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// The fixture cut into socket reads of at most `read_size` bytes
    pub fn reads(&self, read_size: usize) -> impl Iterator<Item = &'static [u8]> {
        self.content().chunks(read_size.max(1))
    }
}

/// Rough size class, used as the benchmark group label
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CaseSize {
    Small,
    Large,
}

impl CaseSize {
    pub fn label(self) -> &'static str {
        match self {
            CaseSize::Small => "small",
            CaseSize::Large => "large",
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct DecodeCase {
    name: &'static str,
    size: CaseSize,
    fixture: RequestFixture,
}

impl DecodeCase {
    pub fn small(name: &'static str, fixture: RequestFixture) -> Self {
        Self { name, size: CaseSize::Small, fixture }
    }

    pub fn large(name: &'static str, fixture: RequestFixture) -> Self {
        Self { name, size: CaseSize::Large, fixture }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> CaseSize {
        self.size
    }

    pub fn fixture(&self) -> &RequestFixture {
        &self.fixture
    }
}
