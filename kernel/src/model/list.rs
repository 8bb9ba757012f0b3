#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub skip: i64,
    pub limit: i64,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self { skip: 0, limit: 10 }
    }
}
