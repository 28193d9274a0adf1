pub mod billing_customer;
pub mod billing_event;
pub mod entitlement;
pub mod mock_exam;
pub mod study_session;
pub mod subject;
pub mod user;
