use crate::events::LendingEvent;

/// Trait for observing committed lending events.
pub trait CirculationObserver {
    /// Called after a state-changing operation commits.
    fn on_event(&self, event: &LendingEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug)]
pub struct TransitionLogger;

impl CirculationObserver for TransitionLogger {
    fn on_event(&self, event: &LendingEvent) {
        tracing::info!(?event, "lending event");
    }
}

/// Emits patron-facing notices for the transitions worth announcing.
#[derive(Debug)]
pub struct NotificationService;

impl CirculationObserver for NotificationService {
    fn on_event(&self, event: &LendingEvent) {
        match event {
            LendingEvent::ReservationPromoted { user, book, .. } => {
                println!("NOTIFICATION: reserved book {book} is now checked out to {user}!");
            }
            LendingEvent::ReservationDiscarded { user, book } => {
                println!("NOTIFICATION: reservation of {user} for book {book} was dropped");
            }
            LendingEvent::Returned { book, fine, .. } if *fine > 0 => {
                println!("NOTIFICATION: late fee of {fine} collected for book {book}");
            }
            _ => {}
        }
    }
}
