// ABOUTME: Demo application sending an SMS through the dispatcher against a simulated modem
// ABOUTME: The modem acks after a short delay and, when asked, follows up with a delivery report

pub(crate) use argh::FromArgs;
use bytes::{BufMut, Bytes, BytesMut};
use gsm_sms::datatypes::{AckResult, RadioFailure, SmsSubmit};
use gsm_sms::radio::{RadioInterface, SendAck, SendCompletion, StatusSink, SubmitPdu};
use gsm_sms::{Decodable, DispatcherBuilder, SendOptions, SendSinks};
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Send an SMS through a simulated modem
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the service centre address (default: modem default)
    #[argh(option, short = 's')]
    smsc: Option<String>,

    /// request a delivery report
    #[argh(switch)]
    delivery_report: bool,

    /// make the modem reject the first attempt so the retry path runs
    #[argh(switch)]
    fail_first: bool,
}

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Fixed SCTS and discharge time used in simulated status reports
const TIMESTAMP: [u8; 7] = [0x52, 0x01, 0x91, 0x21, 0x43, 0x65, 0x00];

struct SimulatedModem {
    next_ref: AtomicU8,
    fail_next: AtomicBool,
    status_sink: Mutex<Option<StatusSink>>,
}

impl SimulatedModem {
    fn status_report(submit: &SmsSubmit, message_ref: u8) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8(0x00); // modem default SMSC
        buf.put_u8(0x06); // SMS-STATUS-REPORT
        buf.put_u8(message_ref);
        submit.destination.encode_tp(&mut buf);
        buf.put_slice(&TIMESTAMP);
        buf.put_slice(&TIMESTAMP);
        buf.put_u8(0x00); // received by the recipient
        buf.freeze()
    }
}

impl RadioInterface for SimulatedModem {
    fn send_sms(&self, pdu: SubmitPdu, completion: SendCompletion) {
        println!("-> {:?}", &pdu);

        if self.fail_next.swap(false, Ordering::SeqCst) {
            println!("<- rejected by network");
            completion.complete(Err(RadioFailure::NetworkReject.into()));
            return;
        }

        let message_ref = self.next_ref.fetch_add(1, Ordering::SeqCst);
        let report = SmsSubmit::from_slice(&pdu.tpdu)
            .ok()
            .filter(|submit| submit.status_report_request)
            .map(|submit| Self::status_report(&submit, message_ref));
        let status_sink = self.status_sink.lock().ok().and_then(|s| s.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            println!("<- ack, message reference {message_ref}");
            completion.complete(Ok(SendAck {
                message_ref,
                ack_pdu: None,
            }));

            if let (Some(report), Some(sink)) = (report, status_sink) {
                tokio::time::sleep(Duration::from_millis(100)).await;
                println!("<- status report for {message_ref}");
                sink.notify(report);
            }
        });
    }

    fn acknowledge_last_incoming_sms(&self, success: bool, result: AckResult, _pdu: Option<Bytes>) {
        println!("-> acknowledge incoming: success={success} result={result:?}");
    }

    fn set_on_sms_status(&self, sink: StatusSink) {
        if let Ok(mut slot) = self.status_sink.lock() {
            *slot = Some(sink);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging {
        Level::TRACE
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let modem = Arc::new(SimulatedModem {
        next_ref: AtomicU8::new(1),
        fail_next: AtomicBool::new(cli_args.fail_first),
        status_sink: Mutex::new(None),
    });
    let dispatcher = DispatcherBuilder::new(modem).build();

    let parts = dispatcher.divide_message(&cli_args.message);
    println!("Sending {} segment(s) to {}", parts.len(), cli_args.to);

    let options = SendOptions::new().with_package("gsm-sms-demo");
    let (sinks, sent, delivered) = if cli_args.delivery_report {
        let (sinks, sent, delivered) = SendSinks::sent_and_delivered();
        (sinks, sent, Some(delivered))
    } else {
        let (sinks, sent) = SendSinks::sent();
        (sinks, sent, None)
    };

    let id = dispatcher.send_text(
        &cli_args.to,
        cli_args.smsc.as_deref(),
        &cli_args.message,
        sinks,
        options,
    )?;

    let report = sent.await?;
    println!("Send {id} finished: {:?}", report.result);

    if let Some(delivered) = delivered {
        if report.result.is_success() {
            let delivery = delivered.await?;
            println!("Send {id} delivery: {:?}", delivery.status);
        }
    }

    dispatcher.wait_idle().await;
    dispatcher.shutdown().await;

    Ok(())
}
