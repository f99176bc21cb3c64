//! Payflow checkout: drives one payment from wallet selection to
//! confirmation against pluggable wallet, routing and backend collaborators.

pub mod backend;
pub mod config;
pub mod error;
pub mod flows;
pub mod history;
pub mod notify;
pub mod orchestrator;
pub mod registry;
pub mod sender;
pub mod settings;
pub mod state;

pub use error::{CheckoutError, Failure};
pub use orchestrator::{
    Checkout, CheckoutMode, CheckoutRequest, Collaborators, NoRouting, RoutedTarget,
    SubmissionTicket,
};
pub use state::{CheckoutState, CheckoutView, Prompt, Quote, Selection, StateKind};
