//! Per-table trigger registry.
//!
//! Triggers are named callbacks bound to a mutation event. They run in
//! registration order; any trigger returning `Veto` vetoes the mutation for the
//! affected record. A trigger that errors or panics is logged and treated as
//! `Proceed`, so a broken trigger never aborts a mutation.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tabula_core::{Error, Record, Result};

/// Event a trigger is bound to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
    BeforeInsert,
    AfterInsert,
    Update,
    Delete,
    /// A user-defined event raised with `fire_trigger`.
    Custom(String),
}

impl TriggerEvent {
    /// Parses an event name; unknown names become `Custom`.
    pub fn parse(name: &str) -> Self {
        match name {
            "beforeInsert" => TriggerEvent::BeforeInsert,
            "afterInsert" => TriggerEvent::AfterInsert,
            "update" => TriggerEvent::Update,
            "delete" => TriggerEvent::Delete,
            other => TriggerEvent::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TriggerEvent::BeforeInsert => "beforeInsert",
            TriggerEvent::AfterInsert => "afterInsert",
            TriggerEvent::Update => "update",
            TriggerEvent::Delete => "delete",
            TriggerEvent::Custom(name) => name,
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a trigger decides about the mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerAction {
    Proceed,
    Veto,
}

/// Arguments passed to a trigger callback.
#[derive(Clone, Copy, Debug)]
pub struct TriggerContext<'a> {
    pub table: &'a str,
    pub operation: &'a TriggerEvent,
    /// Record before the mutation (`Update`, `Delete`).
    pub old: Option<&'a Record>,
    /// Record after the mutation (`BeforeInsert`, `AfterInsert`, `Update`).
    pub new: Option<&'a Record>,
}

/// Trigger callback.
pub type TriggerFn = Rc<dyn Fn(&TriggerContext<'_>) -> anyhow::Result<TriggerAction>>;

/// A registered trigger.
#[derive(Clone)]
pub struct Trigger {
    name: String,
    event: TriggerEvent,
    callback: TriggerFn,
}

impl Trigger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event(&self) -> &TriggerEvent {
        &self.event
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// A trigger that errored or panicked while firing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerFailure {
    pub trigger: String,
    pub message: String,
}

/// Result of firing an event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FireOutcome {
    /// True if any trigger returned `Veto`.
    pub vetoed: bool,
    /// Triggers that failed; each counted as `Proceed`.
    pub failures: Vec<TriggerFailure>,
}

/// Triggers registered on one table, in registration order.
#[derive(Clone, Debug, Default)]
pub struct TriggerRegistry {
    triggers: Vec<Trigger>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a trigger. Fails if `name` is already registered on `table`.
    pub fn create<F>(&mut self, table: &str, name: &str, event: TriggerEvent, callback: F) -> Result<()>
    where
        F: Fn(&TriggerContext<'_>) -> anyhow::Result<TriggerAction> + 'static,
    {
        if self.contains(name) {
            return Err(Error::trigger_exists(table, name));
        }
        self.triggers.push(Trigger {
            name: name.to_string(),
            event,
            callback: Rc::new(callback),
        });
        Ok(())
    }

    /// Unregisters a trigger.
    pub fn remove(&mut self, table: &str, name: &str) -> Result<Trigger> {
        let pos = self
            .triggers
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| Error::trigger_not_found(table, name))?;
        Ok(self.triggers.remove(pos))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.triggers.iter().any(|t| t.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.triggers.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Runs every trigger bound to `event`.
    pub fn fire(
        &self,
        table: &str,
        event: &TriggerEvent,
        old: Option<&Record>,
        new: Option<&Record>,
    ) -> FireOutcome {
        let ctx = TriggerContext {
            table,
            operation: event,
            old,
            new,
        };
        let mut outcome = FireOutcome::default();

        for trigger in self.triggers.iter().filter(|t| &t.event == event) {
            let result = panic::catch_unwind(AssertUnwindSafe(|| (trigger.callback)(&ctx)));
            let message = match result {
                Ok(Ok(TriggerAction::Proceed)) => continue,
                Ok(Ok(TriggerAction::Veto)) => {
                    outcome.vetoed = true;
                    continue;
                }
                Ok(Err(err)) => format!("{err:#}"),
                Err(payload) => panic_message(payload.as_ref()),
            };
            tracing::warn!(
                table,
                trigger = %trigger.name,
                event = %event,
                error = %message,
                "trigger failed; treating as proceed"
            );
            outcome.failures.push(TriggerFailure {
                trigger: trigger.name.clone(),
                message,
            });
        }

        outcome
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "trigger panicked".to_string()
    }
}
