//! Edit scripts: a recorded sequence of UI actions replayed on a session.
//!
//! ```json
//! {
//!   "regions": [
//!     {"page": 1, "startX": 20, "startY": 10, "endX": 100, "endY": 30, "field": "Vendor", "content": "Contoso"}
//!   ],
//!   "commands": [
//!     {"page": 1, "index": 0, "command": {"setRowNumber": 2}}
//!   ]
//! }
//! ```
//!
//! Regions are drawn first (each optionally followed by a field selection
//! and a content edit), then commands run in order. A command that the
//! editor rejects is recorded in the [`ScriptReport`] and the replay carries
//! on; only an unknown page or label index stops it.

use crate::editor::EditCommand;
use crate::error::{EditError, LabelError};
use crate::geometry::Region;
use crate::session::{LabelId, Session};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditScript {
    #[serde(default)]
    pub regions: Vec<DrawnRegion>,
    #[serde(default)]
    pub commands: Vec<ScriptedCommand>,
}

/// A region drawn by hand, in rendered-pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawnRegion {
    pub page: usize,
    #[serde(flatten)]
    pub region: Region,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedCommand {
    pub page: usize,
    pub index: usize,
    pub command: EditCommand,
}

/// One rejected edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditFailure {
    pub label: LabelId,
    pub command: EditCommand,
    pub error: EditError,
}

/// Outcome of [`EditScript::apply`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScriptReport {
    /// Ids of the drawn regions, in script order.
    pub drawn: Vec<LabelId>,
    /// Edits that went through.
    pub applied: usize,
    pub failures: Vec<EditFailure>,
}

impl EditScript {
    /// Replay the script on `session`.
    ///
    /// # Errors
    /// [`LabelError::PageOutOfRange`] or [`LabelError::UnknownLabel`] for a
    /// step that addresses nothing.
    pub fn apply(&self, session: &mut Session) -> Result<ScriptReport, LabelError> {
        let mut report = ScriptReport::default();

        for drawn in &self.regions {
            let id = session.draw_region(drawn.page, drawn.region)?;
            report.drawn.push(id);

            if let Some(field) = &drawn.field {
                run(session, id, EditCommand::SelectField(field.clone()), &mut report)?;
            }
            if let Some(content) = &drawn.content {
                run(session, id, EditCommand::SetContent(content.clone()), &mut report)?;
            }
        }

        for step in &self.commands {
            let id = LabelId {
                page: step.page,
                index: step.index,
            };
            run(session, id, step.command.clone(), &mut report)?;
        }

        Ok(report)
    }
}

fn run(
    session: &mut Session,
    id: LabelId,
    command: EditCommand,
    report: &mut ScriptReport,
) -> Result<(), LabelError> {
    match session.apply(id, command.clone())? {
        Ok(()) => report.applied += 1,
        Err(error) => {
            warn!("{} on {} rejected: {}", command.name(), id, error);
            report.failures.push(EditFailure {
                label: id,
                command,
                error,
            });
        }
    }
    Ok(())
}
