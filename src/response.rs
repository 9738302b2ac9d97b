use crate::error::{Error, ErrorKind};
use bytes::Bytes;
use http_body_util::Full;
use hyper::StatusCode;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Response {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("connection".into(), "close".into())],
            body: Bytes::new(),
        }
    }
}

impl Response {
    pub(crate) fn not_matched(reason: &Error) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            headers: vec![
                ("connection".into(), "close".into()),
                ("content-type".into(), "text/plain".into()),
            ],
            body: Bytes::from(format!(
                "No stub matched the request:\r\n{}",
                reason.context.as_deref().unwrap_or_default()
            )),
        }
    }

    pub(crate) fn malformed(reason: &Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            headers: vec![
                ("connection".into(), "close".into()),
                ("content-type".into(), "text/plain".into()),
            ],
            body: Bytes::from(reason.to_string()),
        }
    }

    pub(crate) fn into_hyper(self) -> Result<hyper::Response<Full<Bytes>>, Error> {
        let mut builder = hyper::Response::builder().status(self.status);

        for (field, value) in &self.headers {
            builder = builder.header(field.as_str(), value.as_str());
        }

        builder
            .body(Full::new(self.body))
            .map_err(|err| Error::new_with_context(ErrorKind::ResponseFailure, err))
    }
}
