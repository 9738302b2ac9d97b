use crate::{Request, RequestPattern};

#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub(crate) request: Request,
    pub(crate) stub_id: Option<String>,
}

///
/// Every request the server received, in arrival order.
///
#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<Entry>,
}

impl Journal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, request: Request, stub_id: Option<String>) {
        self.entries.push(Entry { request, stub_id });
    }

    pub(crate) fn requests(&self) -> impl Iterator<Item = &Request> {
        self.entries.iter().map(|entry| &entry.request)
    }

    pub(crate) fn unmatched(&self) -> impl Iterator<Item = &Request> {
        self.entries
            .iter()
            .filter(|entry| entry.stub_id.is_none())
            .map(|entry| &entry.request)
    }

    pub(crate) fn find<'a>(
        &'a self,
        pattern: &'a RequestPattern,
    ) -> impl Iterator<Item = &'a Request> + 'a {
        self.requests().filter(move |request| pattern.matches(request))
    }

    pub(crate) fn count(&self, pattern: &RequestPattern) -> usize {
        self.find(pattern).count()
    }

    /// The most recent request the pattern rejects, used to explain verification failures.
    pub(crate) fn last_mismatch(&self, pattern: &RequestPattern) -> Option<&Request> {
        self.entries
            .iter()
            .rev()
            .map(|entry| &entry.request)
            .find(|request| !pattern.matches(request))
    }

    pub(crate) fn last_unmatched(&self) -> Option<&Request> {
        self.unmatched().last()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
