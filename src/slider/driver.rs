//! Runs a [`SliderController`] on a tokio task
//!
//! Inputs arrive over a channel, timers are real `tokio::time` sleeps and
//! effects are forwarded to the view. Dropping the handle unmounts the
//! carousel and cancels every pending timer.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::controller::{SliderController, SliderEffect, SliderInput, SliderState};

/// Handle to a running carousel
#[derive(Debug)]
pub struct SliderHandle {
    inputs: mpsc::UnboundedSender<SliderInput>,
    task: JoinHandle<SliderState>,
}

impl SliderHandle {
    /// Forward a gesture or lifecycle event; false once the task has stopped
    pub fn send(&self, input: SliderInput) -> bool {
        self.inputs.send(input).is_ok()
    }

    /// Unmount and return the final state
    pub async fn shutdown(self) -> Option<SliderState> {
        drop(self.inputs);
        self.task.await.ok()
    }
}

/// Start the carousel; effects are delivered on the returned receiver
pub fn spawn(controller: SliderController) -> (SliderHandle, mpsc::UnboundedReceiver<SliderEffect>) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (effect_tx, effect_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(controller, input_rx, effect_tx));

    (
        SliderHandle {
            inputs: input_tx,
            task,
        },
        effect_rx,
    )
}

async fn run(
    mut controller: SliderController,
    mut inputs: mpsc::UnboundedReceiver<SliderInput>,
    effects: mpsc::UnboundedSender<SliderEffect>,
) -> SliderState {
    let emit = |batch: Vec<SliderEffect>| {
        for effect in batch {
            // View may already be gone; keep running until the handle drops
            let _ = effects.send(effect);
        }
    };

    loop {
        let input = match controller.next_deadline() {
            Some(deadline) => {
                tokio::select! {
                    input = inputs.recv() => input,
                    _ = tokio::time::sleep_until(deadline) => {
                        emit(controller.advance(Instant::now()));
                        continue;
                    }
                }
            }
            None => inputs.recv().await,
        };

        let Some(input) = input else {
            break;
        };
        emit(controller.handle(input, Instant::now()));
    }

    controller.teardown();
    tracing::debug!("Slider unmounted");
    controller.state()
}
