//! The per-action gesture state machines.

use gridworks_core::geometry::{GridBounds, GridPosition};
use log::debug;

use crate::input::{ActionEdges, InputFrame};
use crate::session::{DragSession, GestureAction, GestureMode};
use crate::{EditOutcome, EditTarget, GestureOutput, Preview, PreviewGroup, PreviewTint};

const ACTIONS: [GestureAction; 2] = [GestureAction::Place, GestureAction::Erase];

/// Tracks at most one drag session per action.
#[derive(Debug, Clone, Default)]
pub struct GestureInterpreter {
    place: Option<DragSession>,
    erase: Option<DragSession>,
    continue_past_blocked: bool,
}

impl GestureInterpreter {
    pub fn new(continue_past_blocked: bool) -> Self {
        Self {
            place: None,
            erase: None,
            continue_past_blocked,
        }
    }

    pub fn session(&self, action: GestureAction) -> Option<&DragSession> {
        match action {
            GestureAction::Place => self.place.as_ref(),
            GestureAction::Erase => self.erase.as_ref(),
        }
    }

    fn slot(&mut self, action: GestureAction) -> &mut Option<DragSession> {
        match action {
            GestureAction::Place => &mut self.place,
            GestureAction::Erase => &mut self.erase,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.place.is_some() || self.erase.is_some()
    }

    /// Drop every session without committing anything.
    pub fn cancel_all(&mut self) {
        for action in ACTIONS {
            if let Some(session) = self.slot(action).take() {
                debug!(
                    "{:?} drag from ({}, {}) invalidated",
                    session.action, session.start.x, session.start.y
                );
            }
        }
    }

    /// Process one frame of input: update sessions, emit previews, then
    /// apply commits.
    pub fn update<T: EditTarget + ?Sized>(&mut self, frame: &InputFrame, target: &mut T) -> GestureOutput {
        let mut output = GestureOutput::default();
        if frame.pointer_lost {
            self.cancel_all();
        }

        let bounds = target.bounds();
        let hovered = frame.pointer.filter(|cell| bounds.contains(*cell));
        let mode = GestureMode::classify(frame.line_modifier, frame.rect_modifier);

        for action in ACTIONS {
            let edges = edges_for(frame, action);
            let slot = self.slot(action);
            if slot.is_none() && edges.pressed {
                // Presses off the grid start nothing.
                if let Some(start) = hovered {
                    debug!("{action:?} drag started at ({}, {}) in {mode:?} mode", start.x, start.y);
                    *slot = Some(DragSession::new(action, mode, start));
                }
            }
            if let (Some(session), Some(pointer)) = (slot.as_mut(), frame.pointer) {
                session.current = pointer;
            }
        }

        // Previews strictly before commits.
        for action in ACTIONS {
            match self.session(action) {
                Some(session) => {
                    let groups = session
                        .batch_cells(bounds)
                        .into_iter()
                        .map(|cell| preview_group(&*target, action, cell))
                        .collect();
                    output.previews.push(Preview {
                        action,
                        mode: Some(session.mode),
                        groups,
                    });
                }
                None if action == GestureAction::Place => {
                    if let Some(cell) = hovered
                        && target.placement_cells(cell).is_some()
                    {
                        output.previews.push(Preview {
                            action,
                            mode: None,
                            groups: vec![preview_group(&*target, action, cell)],
                        });
                    }
                }
                None => {}
            }
        }

        for action in ACTIONS {
            let edges = edges_for(frame, action);
            let Some(mut session) = self.slot(action).take() else {
                continue;
            };
            match session.mode {
                GestureMode::Free => {
                    if bounds.contains(session.current) {
                        let cell = session.current;
                        if let Some(outcome) = commit_cell(&mut session, target, cell) {
                            output.outcomes.push(outcome);
                        }
                    }
                }
                GestureMode::Line | GestureMode::Rect => {
                    if edges.released || !edges.held {
                        self.commit_batch(&mut session, target, bounds, &mut output);
                    }
                }
            }

            if edges.released || !edges.held {
                debug!(
                    "{action:?} drag from ({}, {}) ended, {} cells edited",
                    session.start.x,
                    session.start.y,
                    session.visited_count()
                );
            } else {
                *self.slot(action) = Some(session);
            }
        }

        output
    }

    fn commit_batch<T: EditTarget + ?Sized>(
        &self,
        session: &mut DragSession,
        target: &mut T,
        bounds: GridBounds,
        output: &mut GestureOutput,
    ) {
        let stop_on_failure = session.mode == GestureMode::Line && !self.continue_past_blocked;
        for cell in session.batch_cells(bounds) {
            let Some(outcome) = commit_cell(session, target, cell) else {
                continue;
            };
            let failed = outcome.result.is_err();
            output.outcomes.push(outcome);
            if failed && stop_on_failure {
                debug!("line commit stopped at blocked cell ({}, {})", cell.x, cell.y);
                break;
            }
        }
    }
}

fn edges_for(frame: &InputFrame, action: GestureAction) -> ActionEdges {
    match action {
        GestureAction::Place => frame.place,
        GestureAction::Erase => frame.erase,
    }
}

fn preview_group<T: EditTarget + ?Sized>(target: &T, action: GestureAction, cell: GridPosition) -> PreviewGroup {
    match action {
        GestureAction::Place => PreviewGroup {
            anchor: cell,
            cells: target.placement_cells(cell).unwrap_or_else(|| vec![cell]),
            tint: if target.can_place_at(cell) {
                PreviewTint::Valid
            } else {
                PreviewTint::Blocked
            },
        },
        GestureAction::Erase => {
            let cells = if target.is_occupied(cell) {
                target.erase_cells(cell)
            } else {
                vec![cell]
            };
            PreviewGroup {
                anchor: cell,
                cells,
                tint: PreviewTint::Blocked,
            }
        }
    }
}

/// Attempt one edit unless this drag already touched the cell.
fn commit_cell<T: EditTarget + ?Sized>(
    session: &mut DragSession,
    target: &mut T,
    cell: GridPosition,
) -> Option<EditOutcome> {
    if session.was_visited(cell) {
        return None;
    }
    let result = match session.action {
        GestureAction::Place => {
            session.visit(cell);
            target.commit_place(cell)
        }
        GestureAction::Erase => {
            // Claim the whole footprint so later cells of the same entity
            // are not reported as empty.
            for covered in target.erase_cells(cell) {
                session.visit(covered);
            }
            session.visit(cell);
            target.commit_erase(cell)
        }
    };
    Some(EditOutcome {
        action: session.action,
        cell,
        result,
    })
}
