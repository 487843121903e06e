// One participant row: created on join, removed again on a clean leave.
// The channel is the relay handle of the player's live connection.
#[derive(Clone, Debug)]
pub struct Player {
    pub id: u64,
    pub channel: u64,
}
