use crate::protocol::Message;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of one handler invocation.
///
/// Handlers rarely build this directly; any output type with an `Into`
/// conversion works:
///
/// | handler output            | outcome                        |
/// |---------------------------|--------------------------------|
/// | `()`                      | `NoReply`                      |
/// | `Message`                 | `Reply(message)`               |
/// | `Option<Message>`         | `Reply` or `NoReply`           |
/// | `Result<T, E: Display>`   | `T`'s outcome or `Failure`     |
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// Completed without a result. A caller that supplied an id still gets a
    /// response carrying only the routing fields.
    NoReply,

    /// Completed with a result message.
    Reply(Message),

    /// Failed; the text becomes the response `error` field.
    Failure(String),
}

impl From<()> for HandlerOutcome {
    fn from(_: ()) -> Self {
        HandlerOutcome::NoReply
    }
}

impl From<Message> for HandlerOutcome {
    fn from(message: Message) -> Self {
        HandlerOutcome::Reply(message)
    }
}

impl From<Option<Message>> for HandlerOutcome {
    fn from(message: Option<Message>) -> Self {
        match message {
            Some(message) => HandlerOutcome::Reply(message),
            None => HandlerOutcome::NoReply,
        }
    }
}

impl<T, E> From<Result<T, E>> for HandlerOutcome
where
    T: Into<HandlerOutcome>,
    E: Display,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(err) => HandlerOutcome::Failure(err.to_string()),
        }
    }
}

/// Type-erased service handler.
pub(crate) trait HandlerFn: Send + Sync {
    fn call(&self, request: Message) -> BoxFuture<'static, HandlerOutcome>;
}

pub(crate) type BoxedHandler = Arc<dyn HandlerFn>;

// Implementation of HandlerFn for handler closures
struct Handler<F> {
    func: F,
}

impl<F, Fut, O> HandlerFn for Handler<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<HandlerOutcome>,
{
    fn call(&self, request: Message) -> BoxFuture<'static, HandlerOutcome> {
        let fut = (self.func)(request);
        Box::pin(async move { fut.await.into() })
    }
}

/// Wrap a handler closure into a type-erased handler
///
/// This allows the registry to store handlers of different types in the same map.
pub(crate) fn wrap_handler<F, Fut, O>(func: F) -> BoxedHandler
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<HandlerOutcome>,
{
    Arc::new(Handler { func })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn test_output_conversions() {
        // ---
        let unit = wrap_handler(|_msg: Message| async {});
        assert_eq!(unit.call(Message::new()).await, HandlerOutcome::NoReply);

        let echo = wrap_handler(|msg: Message| async move { msg });
        assert_eq!(
            echo.call(Message::text("x")).await,
            HandlerOutcome::Reply(Message::text("x"))
        );

        let maybe = wrap_handler(|msg: Message| async move { msg.payload.map(Message::text) });
        assert_eq!(maybe.call(Message::new()).await, HandlerOutcome::NoReply);

        let failing =
            wrap_handler(|_msg: Message| async { Err::<Message, _>("division by zero") });
        assert_eq!(
            failing.call(Message::new()).await,
            HandlerOutcome::Failure("division by zero".into())
        );
    }
}
