//! Static routing table: which step consumes which event

use super::event::EventKind;
use thiserror::Error;

/// The steps an event can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Ask the model what to do next
    Chat,
    /// Fan a list of calls out into individual requests
    Dispatch,
    /// Run one tool call as a concurrent task
    Invoke,
    /// Fan results back in behind the barrier
    Gather,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Step(StepKind),
    /// The event ends the run
    Terminal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("No route for event {0:?}")]
    Missing(EventKind),
    #[error("More than one route for event {0:?}")]
    Duplicate(EventKind),
    #[error("Event {0:?} must not be terminal")]
    UnexpectedTerminal(EventKind),
    #[error("Stopped must be the terminal event")]
    StoppedNotTerminal,
}

/// The router's wiring
pub const ROUTES: &[(EventKind, Route)] = &[
    (EventKind::Start, Route::Step(StepKind::Chat)),
    (EventKind::InputReady, Route::Step(StepKind::Chat)),
    (EventKind::CallsGathered, Route::Step(StepKind::Dispatch)),
    (EventKind::CallRequested, Route::Step(StepKind::Invoke)),
    (EventKind::CallCompleted, Route::Step(StepKind::Gather)),
    (EventKind::Stopped, Route::Terminal),
];

/// Validated event → step table. Every [`EventKind`] has exactly one
/// route and `Stopped` is the only terminal.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: [Route; EventKind::COUNT],
}

impl RouteTable {
    pub fn new() -> Result<Self, RouteTableError> {
        Self::from_routes(ROUTES)
    }

    pub fn from_routes(routes: &[(EventKind, Route)]) -> Result<Self, RouteTableError> {
        let mut slots: [Option<Route>; EventKind::COUNT] = [None; EventKind::COUNT];
        for &(kind, route) in routes {
            let slot = &mut slots[kind.index()];
            if slot.is_some() {
                return Err(RouteTableError::Duplicate(kind));
            }
            match (kind, route) {
                (EventKind::Stopped, Route::Step(_)) => {
                    return Err(RouteTableError::StoppedNotTerminal)
                }
                (EventKind::Stopped, Route::Terminal) | (_, Route::Step(_)) => {}
                (other, Route::Terminal) => return Err(RouteTableError::UnexpectedTerminal(other)),
            }
            *slot = Some(route);
        }

        let mut table = [Route::Terminal; EventKind::COUNT];
        for kind in EventKind::ALL {
            table[kind.index()] = slots[kind.index()].ok_or(RouteTableError::Missing(kind))?;
        }
        Ok(Self { routes: table })
    }

    pub fn route(&self, kind: EventKind) -> Route {
        self.routes[kind.index()]
    }
}
