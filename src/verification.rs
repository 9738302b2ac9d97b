use crate::diff;
use crate::journal::Journal;
use crate::{Error, ErrorKind, RequestPattern};
use std::fmt;

///
/// How many journal entries a verification expects to match its pattern.
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Times {
    /// Exactly this many requests
    Exactly(usize),
    /// This many requests or more
    AtLeast(usize),
    /// This many requests or fewer
    AtMost(usize),
    /// Between the two bounds, both included
    Between(usize, usize),
}

impl Times {
    pub(crate) fn accepts(&self, count: usize) -> bool {
        match *self {
            Times::Exactly(expected) => count == expected,
            Times::AtLeast(min) => count >= min,
            Times::AtMost(max) => count <= max,
            Times::Between(min, max) => count >= min && count <= max,
        }
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Times::Exactly(expected) => write!(f, "{}", expected),
            Times::AtLeast(min) => write!(f, "at least {}", min),
            Times::AtMost(max) => write!(f, "at most {}", max),
            Times::Between(min, max) => write!(f, "between {} and {}", min, max),
        }
    }
}

pub(crate) fn verify(journal: &Journal, times: Times, pattern: &RequestPattern) -> Result<(), Error> {
    let count = journal.count(pattern);
    if times.accepts(count) {
        return Ok(());
    }

    let mut message = format!(
        "\n> Expected {} request(s) matching:\n{}\n...but received {}\n\n",
        times, pattern, count
    );

    if let Some(closest) = journal.last_mismatch(pattern) {
        let closest = closest.to_string();
        message.push_str(&format!(
            "> The last request not matching was:\n{}\n",
            closest
        ));

        let difference = diff::compare(&pattern.to_string(), &closest);
        message.push_str(&format!("> Difference:\n{}\n", difference));
    }

    log::debug!("Verification failed: {}", message);

    Err(Error::new_with_context(
        ErrorKind::VerificationFailure,
        message,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::build;

    #[test]
    fn test_times() {
        assert!(Times::Exactly(1).accepts(1));
        assert!(!Times::Exactly(1).accepts(0));
        assert!(!Times::Exactly(1).accepts(2));
        assert!(Times::AtLeast(1).accepts(3));
        assert!(!Times::AtMost(1).accepts(2));
        assert!(Times::Between(1, 3).accepts(3));
        assert!(!Times::Between(1, 3).accepts(4));
    }

    #[test]
    fn test_verify_reports_the_count() {
        let mut journal = Journal::new();
        journal.record(build("GET", "/hello", &[], ""), None);
        journal.record(build("GET", "/hello", &[], ""), None);

        let pattern = RequestPattern::get("/hello");
        assert!(verify(&journal, Times::AtLeast(1), &pattern).is_ok());

        let error = verify(&journal, Times::Exactly(1), &pattern).unwrap_err();
        assert_eq!(ErrorKind::VerificationFailure, error.kind);
        assert!(error
            .context
            .unwrap()
            .starts_with("\n> Expected 1 request(s) matching:\n\r\nGET /hello\r\n\n...but received 2\n"));
    }

    #[test]
    fn test_verify_shows_the_last_mismatch() {
        let mut journal = Journal::new();
        journal.record(build("GET", "/bye", &[], ""), None);

        let error = verify(&journal, Times::Exactly(1), &RequestPattern::get("/hello")).unwrap_err();
        let context = error.context.unwrap();

        assert!(context.contains("> The last request not matching was:\n\r\nGET /bye\r\n"));
        assert!(context.contains("> Difference:\n"));
    }
}
