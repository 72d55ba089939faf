#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Composition of data-bound forms over schema-governed collections.
//!
//! A [`FormWrapper`] decides between creating and editing, resolves the
//! fragments the form reads and returns, and lists the adapters wrapped
//! around it. A [`FormContainer`] mounts a wrapper once and drives the
//! loading gate of edit forms.

mod container;
mod error;
mod form;
pub mod fragment;
mod gate;
pub mod generate;
mod parser;
mod registry;
mod source;

pub use container::{FormContainer, Render, View};
pub use error::{FormError, ParseError, Result};
pub use form::{
    FetchPolicy, FormConfig, FormMode, FormWrapper, Layer, MutationBinding, MutationRequest,
    SingleQuery,
};
pub use fragment::{Fragment, Selection};
pub use gate::{GateState, GateView, LoadingGate};
pub use parser::parse_fragments;
pub use registry::FragmentRegistry;
pub use source::{resolve_fragment, ExplicitFragment, FragmentSource};
