//! Entity loading and binding.
//!
//! A [`Loader`] follows the identifier a form is bound to. Binding a new
//! identifier hands out a [`LoadTicket`]; the fetch it stands for runs as an
//! effect and comes back through [`Loader::resolve`]. Every bind and every
//! cancel bumps the generation, so a result can only land while its ticket is
//! still the newest one. Anything older is dropped on arrival.

use tracing::{debug, warn};

use crate::binding::{EditingContext, FormKind};
use crate::error::{DispatchError, LoadError};

/// A loaded entity together with its form projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound<K: FormKind> {
    pub entity: K::Entity,
    pub values: K::Values,
    pub context: EditingContext<K>,
}

impl<K: FormKind> Bound<K> {
    pub fn from_entity(entity: K::Entity) -> Self {
        Self {
            values: K::to_form(&entity),
            context: EditingContext::for_entity(&entity),
            entity,
        }
    }
}

/// One requested fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket<K: FormKind> {
    pub id: K::Id,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindState<K: FormKind> {
    /// No identifier bound, or the last load was cancelled.
    Idle,
    Loading { id: K::Id, generation: u64 },
    Ready { generation: u64, bound: Bound<K> },
    /// The fetch failed. The form stays absent; nothing retries.
    Failed { id: K::Id, error: LoadError },
}

impl<K: FormKind> BindState<K> {
    pub fn form_values(&self) -> Option<&K::Values> {
        match self {
            Self::Ready { bound, .. } => Some(&bound.values),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready { .. } | Self::Failed { .. })
    }
}

/// What [`Loader::resolve`] did with a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<K: FormKind> {
    Applied(Bound<K>),
    Failed(LoadError),
    /// Superseded or cancelled before it arrived.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Loader<K: FormKind> {
    current: Option<K::Id>,
    generation: u64,
    state: BindState<K>,
}

impl<K: FormKind> Default for Loader<K> {
    fn default() -> Self {
        Self {
            current: None,
            generation: 0,
            state: BindState::Idle,
        }
    }
}

impl<K: FormKind> Loader<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BindState<K> {
        &self.state
    }

    pub fn current_id(&self) -> Option<&K::Id> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Binds an identifier. Re-binding the current identifier is a no-op, so
    /// hosts may send it on every render.
    ///
    /// Returns the ticket of the fetch to start, if any.
    pub fn bind(&mut self, id: Option<K::Id>) -> Option<LoadTicket<K>> {
        if self.current == id {
            return None;
        }
        self.generation += 1;
        self.current.clone_from(&id);

        let Some(id) = id else {
            self.state = BindState::Idle;
            return None;
        };

        debug!(kind = K::NAME, %id, generation = self.generation, "binding entity");
        self.state = BindState::Loading {
            id: id.clone(),
            generation: self.generation,
        };
        Some(LoadTicket {
            id,
            generation: self.generation,
        })
    }

    /// Applies a fetch result if its ticket is still the newest one.
    pub fn resolve(
        &mut self,
        generation: u64,
        result: Result<K::Entity, DispatchError>,
    ) -> Resolution<K> {
        let id = match &self.state {
            BindState::Loading { id, generation: g } if *g == generation => id.clone(),
            _ => {
                debug!(kind = K::NAME, generation, "discarded stale load result");
                return Resolution::Stale;
            }
        };

        match result {
            Ok(entity) => {
                let bound = Bound::from_entity(entity);
                self.state = BindState::Ready {
                    generation,
                    bound: bound.clone(),
                };
                Resolution::Applied(bound)
            }
            Err(err) => {
                warn!(kind = K::NAME, %id, %err, "load failed; form stays hidden");
                let error = LoadError::Fetch(err);
                self.state = BindState::Failed {
                    id,
                    error: error.clone(),
                };
                Resolution::Failed(error)
            }
        }
    }

    /// Drops the in-flight load, if any, and forgets the bound identifier so
    /// binding it again starts a fresh fetch.
    pub fn cancel(&mut self) {
        if self.state.is_loading() {
            debug!(kind = K::NAME, generation = self.generation, "load cancelled");
        }
        self.generation += 1;
        self.current = None;
        self.state = BindState::Idle;
    }
}
