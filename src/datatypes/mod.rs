mod address;
mod data_coding;
pub mod gsm_alphabet;
mod priority;
mod result_code;
mod sms_submit;
mod status_report;
mod user_data_header;
mod validity_period;

pub use address::{AddressError, GsmAddress, NumberingPlan, TypeOfNumber, MAX_ADDRESS_DIGITS};
pub use data_coding::DataCoding;
pub use priority::Priority;
pub use result_code::{AckResult, RadioFailure, SmsResult};
pub use sms_submit::{flags as submit_flags, SmsSubmit, UserData};
pub use status_report::{ServiceCentreTimestamp, SmsStatusReport, TpStatus};
pub use user_data_header::{iei, ConcatInfo, InformationElement, UserDataHeader};
pub use validity_period::{encode_relative_validity_minutes, RelativeValidity};
