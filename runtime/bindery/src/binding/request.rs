use std::io::Read;

/// A request that may carry a body to bind from.
///
/// It's implemented for [`http::Request<Option<B>>`](http::Request), where a `None` body
/// stands for a request that was received without one.
/// Implement it for your own request type to bind from it directly.
pub trait RequestContext {
    /// The reader over the request body.
    type Body: Read;

    /// The request body, if there is one.
    fn body(&mut self) -> Option<&mut Self::Body>;
}

impl<B: Read> RequestContext for http::Request<Option<B>> {
    type Body = B;

    fn body(&mut self) -> Option<&mut B> {
        self.body_mut().as_mut()
    }
}
