use crate::{
    error::Result,
    form::{FormConfig, FormWrapper, SingleQuery},
    gate::{GateView, LoadingGate},
    registry::FragmentRegistry,
};
use schema::RecordRoot;
use std::sync::Arc;

/// A mounted form. The wrapper is built once on mount and every render hands
/// out the same instance.
#[derive(Debug)]
pub struct FormContainer {
    wrapper: Arc<FormWrapper>,
    gate: Option<LoadingGate>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View<'a> {
    /// The form itself, prefilled with the loaded document when editing
    Form(Option<&'a RecordRoot>),
    Loading,
    Error(&'a str),
}

/// Output of a single render pass
#[derive(Debug)]
pub struct Render<'a> {
    pub wrapper: Arc<FormWrapper>,
    pub view: View<'a>,
}

impl FormContainer {
    pub fn mount(config: &FormConfig, registry: &FragmentRegistry) -> Result<Self> {
        let wrapper = FormWrapper::build(config, registry)?;
        let gate = wrapper.has_loading_gate().then(LoadingGate::new);

        Ok(Self {
            wrapper: Arc::new(wrapper),
            gate,
        })
    }

    pub fn wrapper(&self) -> &Arc<FormWrapper> {
        &self.wrapper
    }

    /// The fetch to issue now, if any. Returns `None` while a fetch is
    /// outstanding or once the document has been loaded.
    pub fn poll_fetch(&mut self) -> Option<&SingleQuery> {
        let gate = self.gate.as_mut()?;
        if !gate.begin_fetch() {
            return None;
        }
        self.wrapper.single_query()
    }

    /// Delivers the result of the fetch returned by [`Self::poll_fetch`]
    pub fn receive(&mut self, result: std::result::Result<Option<RecordRoot>, String>) -> bool {
        self.gate
            .as_mut()
            .map_or(false, |gate| gate.resolve(result))
    }

    /// Re-arms the fetch after a failed load
    pub fn retry(&mut self) -> bool {
        self.gate.as_mut().map_or(false, LoadingGate::retry)
    }

    pub fn render(&self) -> Render<'_> {
        let view = match self.gate.as_ref().map(LoadingGate::view) {
            None => View::Form(None),
            Some(GateView::Form(document)) => View::Form(Some(document)),
            Some(GateView::Loading) => View::Loading,
            Some(GateView::Error(err)) => View::Error(err),
        };

        Render {
            wrapper: Arc::clone(&self.wrapper),
            view,
        }
    }
}
