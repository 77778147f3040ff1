use answer_sync::SyncEvent;
use shared::protocol::SyncSnapshot;

pub fn render_snapshot(snapshot: &SyncSnapshot) -> String {
    let mut line = format!("[{}] {}", snapshot.field_id, snapshot.indicator());
    if let Some(saved) = snapshot.last_saved_label() {
        line.push_str(" | ");
        line.push_str(&saved);
    }
    line
}

pub fn render_event(event: &SyncEvent) -> String {
    match event {
        SyncEvent::StatusChanged(snapshot) => render_snapshot(snapshot),
        SyncEvent::SaveFailed {
            field_id, reason, ..
        } => format!("[{field_id}] save failed: {reason}"),
    }
}
