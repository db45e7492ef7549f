pub mod codec;
pub mod datatypes;
pub mod dispatcher;
pub mod ims;
pub mod inbound;
pub mod policy;
pub mod radio;
pub mod segment;


// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable};

// Re-export the main dispatcher API for easy access
pub use datatypes::{AckResult, RadioFailure, SmsResult};
pub use dispatcher::{
    DispatchError, DispatchResult, DispatcherBuilder, DispatcherConfig, GsmSmsDispatcher,
    SendId, SendOptions, SendSinks,
};
pub use radio::{RadioInterface, SendAck, SendCompletion, SendFailure, ServiceState, StatusSink, SubmitPdu};

/// Error returned by the demo and other top-level helpers.
///
/// Library calls return their own error enums; this boxed form is for
/// callers that mix them with I/O and parsing errors.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for top-level helpers.
///
/// # Examples
///
/// ## Sending a text message
///
/// ```rust,no_run
/// use gsm_sms::{DispatcherBuilder, RadioInterface, SendOptions, SendSinks};
/// use std::sync::Arc;
///
/// async fn send(radio: Arc<dyn RadioInterface>) -> gsm_sms::Result<()> {
///     let dispatcher = DispatcherBuilder::new(radio).build();
///
///     let (sinks, sent) = SendSinks::sent();
///     dispatcher.send_text("6501002000", None, "test sms", sinks, SendOptions::default())?;
///
///     let report = sent.await?;
///     println!("Sent {} with result {:?}", report.send_id, report.result);
///
///     dispatcher.shutdown().await;
///     Ok(())
/// }
/// ```
///
/// ## Delivery reports and options
///
/// ```rust,no_run
/// use gsm_sms::{DispatcherBuilder, RadioInterface, SendOptions, SendSinks};
/// use gsm_sms::datatypes::Priority;
/// use std::sync::Arc;
///
/// async fn send(radio: Arc<dyn RadioInterface>) -> gsm_sms::Result<()> {
///     let dispatcher = DispatcherBuilder::new(radio).build();
///
///     let options = SendOptions::new()
///         .with_package("com.example.messaging")
///         .with_priority(Priority::Interactive)
///         .with_validity_minutes(24 * 60);
///
///     let (sinks, sent, delivered) = SendSinks::sent_and_delivered();
///     dispatcher.send_text("+16501002000", Some("+15551234"), "Hello!", sinks, options)?;
///
///     println!("{:?}", sent.await?.result);
///     println!("{:?}", delivered.await?.status);
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
