// Typed publish/subscribe bus for overlay events
//
// Handlers run in subscription order. A handler returning `Propagation::Stop`
// vetoes the default handling of the event and no later handler sees it.

use crate::dataset::ParticleIndex;
use crate::error::OverlayError;

/// Event names as exposed to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Init,
    Load,
    LoadError,
    Ready,
    Render,
    ParticleMouseOver,
    ParticleMouseIn,
    ParticleMouseOut,
    ParticleClick,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Init => "init",
            EventKind::Load => "load",
            EventKind::LoadError => "loaderror",
            EventKind::Ready => "ready",
            EventKind::Render => "render",
            EventKind::ParticleMouseOver => "particlemouseover",
            EventKind::ParticleMouseIn => "particlemousein",
            EventKind::ParticleMouseOut => "particlemouseout",
            EventKind::ParticleClick => "particleclick",
        }
    }
}

/// Pointer event that triggered a particle event, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug)]
pub enum OverlayEvent<'a> {
    Init,
    /// Dataset parsed, grid not built yet
    Load { particles: usize },
    LoadError { error: &'a OverlayError },
    Ready { particles: usize },
    Render,
    /// Every particle of the cell under the cursor
    ParticleMouseOver { targets: &'a [ParticleIndex], pointer: PointerEvent },
    ParticleMouseIn { target: ParticleIndex },
    /// `pointer` is absent when the hover is dropped by `dispose`
    ParticleMouseOut { target: ParticleIndex, pointer: Option<PointerEvent> },
    ParticleClick { target: ParticleIndex, pointer: PointerEvent },
}

impl OverlayEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            OverlayEvent::Init => EventKind::Init,
            OverlayEvent::Load { .. } => EventKind::Load,
            OverlayEvent::LoadError { .. } => EventKind::LoadError,
            OverlayEvent::Ready { .. } => EventKind::Ready,
            OverlayEvent::Render => EventKind::Render,
            OverlayEvent::ParticleMouseOver { .. } => EventKind::ParticleMouseOver,
            OverlayEvent::ParticleMouseIn { .. } => EventKind::ParticleMouseIn,
            OverlayEvent::ParticleMouseOut { .. } => EventKind::ParticleMouseOut,
            OverlayEvent::ParticleClick { .. } => EventKind::ParticleClick,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    #[default]
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&OverlayEvent<'_>) -> Propagation>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&OverlayEvent<'_>) -> Propagation + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn dispatch(&mut self, event: &OverlayEvent<'_>) -> Propagation {
        let kind = event.kind();
        for subscription in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
            if (subscription.handler)(event) == Propagation::Stop {
                return Propagation::Stop;
            }
        }
        Propagation::Continue
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.subscriptions.iter().filter(|s| s.kind == kind).count()
    }
}
