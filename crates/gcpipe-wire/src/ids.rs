//! Message/command identifiers on the instrument link.
//!
//! The id occupies byte 1 of every frame. `0` is the cleared-slot sentinel of
//! the legacy protocol and must never travel on the wire; `255` is reserved
//! for FAULT responses. Everything in between is command space.

/// The "no message" sentinel. Never valid on the wire.
pub const ID_NONE: u8 = 0;

/// Echo probe; the peer returns the request params unchanged.
pub const TEST_CALL: u8 = 28;

/// Points buffered for a channel since the last read (`u16` LE response).
pub const IS_DATA_AVAILABLE: u8 = 30;

/// Drain buffered points for a channel (`[n]` + `n x i32` LE response).
pub const READ_DATA: u8 = 31;

/// Whether a channel run is in progress (`[0|1]` response).
pub const IS_RUNNING: u8 = 32;

/// Start or stop a channel run (`[channel, 0|1]` request).
pub const SET_RUNNING: u8 = 33;

/// Load a control file by UTF-8 path.
pub const LOAD_CONTROL_FILE: u8 = 34;

/// Negative acknowledgement: `[failed_id, fault_code]` params.
pub const FAULT: u8 = 255;

/// Most points a single READ_DATA response can carry.
/// 1 count byte + 62 x 4 value bytes = 249, inside the 253-byte params cap.
pub const MAX_DATA_POINTS_PER_READ: usize = 62;

/// Fault code: the command id is not implemented by the peer.
pub const FAULT_UNKNOWN_COMMAND: u8 = 1;
/// Fault code: params did not match the command's shape.
pub const FAULT_MALFORMED_PARAMS: u8 = 2;
/// Fault code: instrument channel outside `1..=6`.
pub const FAULT_CHANNEL_OUT_OF_RANGE: u8 = 3;
/// Fault code: the control file path was rejected.
pub const FAULT_CONTROL_FILE_REJECTED: u8 = 4;
/// Fault code: the instrument is busy (run in progress).
pub const FAULT_BUSY: u8 = 5;

/// Returns a human-readable name for a message id.
pub fn id_name(id: u8) -> &'static str {
    match id {
        ID_NONE => "NONE",
        TEST_CALL => "TEST_CALL",
        IS_DATA_AVAILABLE => "IS_DATA_AVAILABLE",
        READ_DATA => "READ_DATA",
        IS_RUNNING => "IS_RUNNING",
        SET_RUNNING => "SET_RUNNING",
        LOAD_CONTROL_FILE => "LOAD_CONTROL_FILE",
        FAULT => "FAULT",
        _ => "UNASSIGNED",
    }
}

/// Returns a human-readable name for a fault code.
pub fn fault_name(code: u8) -> &'static str {
    match code {
        FAULT_UNKNOWN_COMMAND => "unknown command",
        FAULT_MALFORMED_PARAMS => "malformed params",
        FAULT_CHANNEL_OUT_OF_RANGE => "channel out of range",
        FAULT_CONTROL_FILE_REJECTED => "control file rejected",
        FAULT_BUSY => "busy",
        _ => "unspecified fault",
    }
}

/// Returns true if the id is reserved (never a command).
pub fn is_reserved(id: u8) -> bool {
    id == ID_NONE || id == FAULT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids() {
        assert!(is_reserved(ID_NONE));
        assert!(is_reserved(FAULT));
        assert!(!is_reserved(TEST_CALL));
        assert!(!is_reserved(READ_DATA));
    }

    #[test]
    fn names_cover_command_table() {
        assert_eq!(id_name(TEST_CALL), "TEST_CALL");
        assert_eq!(id_name(LOAD_CONTROL_FILE), "LOAD_CONTROL_FILE");
        assert_eq!(id_name(FAULT), "FAULT");
        assert_eq!(id_name(200), "UNASSIGNED");
    }

    #[test]
    fn read_data_batch_fits_params_cap() {
        assert!(1 + MAX_DATA_POINTS_PER_READ * 4 <= crate::codec::MAX_PARAMS_LEN);
    }
}
