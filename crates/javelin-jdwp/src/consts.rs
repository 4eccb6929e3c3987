//! Protocol constants: command identifiers, tags, error codes, event kinds.

/// A JDWP command identified by its command-set and command numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub set: u8,
    pub command: u8,
}

impl Command {
    pub const fn new(set: u8, command: u8) -> Self {
        Self { set, command }
    }
}

// Command set 1: VirtualMachine.
pub const VM_VERSION: Command = Command::new(1, 1);
pub const VM_CLASSES_BY_SIGNATURE: Command = Command::new(1, 2);
pub const VM_ALL_CLASSES: Command = Command::new(1, 3);
pub const VM_ALL_THREADS: Command = Command::new(1, 4);
/// Never sent. Dispose tears down the shared proxy session for every peer.
pub const VM_DISPOSE: Command = Command::new(1, 6);
pub const VM_ID_SIZES: Command = Command::new(1, 7);
pub const VM_SUSPEND: Command = Command::new(1, 8);
pub const VM_RESUME: Command = Command::new(1, 9);
pub const VM_CREATE_STRING: Command = Command::new(1, 11);

// Command set 2: ReferenceType.
pub const REFTYPE_SIGNATURE: Command = Command::new(2, 1);
pub const REFTYPE_CLASS_LOADER: Command = Command::new(2, 2);
pub const REFTYPE_FIELDS: Command = Command::new(2, 4);
pub const REFTYPE_METHODS: Command = Command::new(2, 5);
pub const REFTYPE_SOURCE_FILE: Command = Command::new(2, 7);

// Command set 3: ClassType.
pub const CLASSTYPE_SUPERCLASS: Command = Command::new(3, 1);
pub const CLASSTYPE_INVOKE_METHOD: Command = Command::new(3, 3);

// Command set 4: ArrayType.
pub const ARRAYTYPE_NEW_INSTANCE: Command = Command::new(4, 1);

// Command set 6: Method.
pub const METHOD_LINE_TABLE: Command = Command::new(6, 1);
pub const METHOD_VARIABLE_TABLE: Command = Command::new(6, 2);

// Command set 9: ObjectReference.
pub const OBJREF_REFERENCE_TYPE: Command = Command::new(9, 1);
pub const OBJREF_GET_VALUES: Command = Command::new(9, 2);
pub const OBJREF_INVOKE_METHOD: Command = Command::new(9, 6);
pub const OBJREF_DISABLE_COLLECTION: Command = Command::new(9, 7);
pub const OBJREF_ENABLE_COLLECTION: Command = Command::new(9, 8);

// Command set 10: StringReference.
pub const STRING_VALUE: Command = Command::new(10, 1);

// Command set 11: ThreadReference.
pub const THREAD_NAME: Command = Command::new(11, 1);
pub const THREAD_RESUME: Command = Command::new(11, 3);
pub const THREAD_STATUS: Command = Command::new(11, 4);
pub const THREAD_FRAMES: Command = Command::new(11, 6);
pub const THREAD_FRAME_COUNT: Command = Command::new(11, 7);

// Command set 13: ArrayReference.
pub const ARRAY_LENGTH: Command = Command::new(13, 1);
pub const ARRAY_GET_VALUES: Command = Command::new(13, 2);
pub const ARRAY_SET_VALUES: Command = Command::new(13, 3);

// Command set 15: EventRequest.
pub const EVENTREQ_SET: Command = Command::new(15, 1);
pub const EVENTREQ_CLEAR: Command = Command::new(15, 2);

// Command set 16: StackFrame.
pub const FRAME_GET_VALUES: Command = Command::new(16, 1);
pub const FRAME_THIS_OBJECT: Command = Command::new(16, 3);

// Command set 17: ClassObjectReference.
pub const CLASSOBJ_REFLECTED_TYPE: Command = Command::new(17, 1);

// Command set 64: Event (target → debugger).
pub const EVENT_COMPOSITE: Command = Command::new(64, 100);

/// Value and object-identity tag bytes.
pub mod tag {
    pub const ARRAY: u8 = b'[';
    pub const BYTE: u8 = b'B';
    pub const CHAR: u8 = b'C';
    pub const OBJECT: u8 = b'L';
    pub const FLOAT: u8 = b'F';
    pub const DOUBLE: u8 = b'D';
    pub const INT: u8 = b'I';
    pub const LONG: u8 = b'J';
    pub const SHORT: u8 = b'S';
    pub const VOID: u8 = b'V';
    pub const BOOLEAN: u8 = b'Z';
    pub const STRING: u8 = b's';
    pub const THREAD: u8 = b't';
    pub const THREAD_GROUP: u8 = b'g';
    pub const CLASS_LOADER: u8 = b'l';
    pub const CLASS_OBJECT: u8 = b'c';

    pub fn is_object_like(tag: u8) -> bool {
        matches!(
            tag,
            ARRAY | OBJECT | STRING | THREAD | THREAD_GROUP | CLASS_LOADER | CLASS_OBJECT
        )
    }
}

/// Event kinds (EventRequest.Set / composite event packets).
pub mod event_kind {
    pub const SINGLE_STEP: u8 = 1;
    pub const BREAKPOINT: u8 = 2;
    pub const EXCEPTION: u8 = 4;
    pub const THREAD_START: u8 = 6;
    pub const THREAD_DEATH: u8 = 7;
    pub const CLASS_PREPARE: u8 = 8;
    pub const VM_START: u8 = 90;
    pub const VM_DEATH: u8 = 99;
}

/// EventRequest modifier kinds.
pub mod modifier_kind {
    pub const COUNT: u8 = 1;
    pub const THREAD_ONLY: u8 = 3;
    pub const CLASS_MATCH: u8 = 5;
    pub const LOCATION_ONLY: u8 = 7;
    pub const EXCEPTION_ONLY: u8 = 8;
    pub const STEP: u8 = 10;
}

pub mod suspend_policy {
    pub const NONE: u8 = 0;
    pub const EVENT_THREAD: u8 = 1;
    pub const ALL: u8 = 2;
}

pub mod step {
    pub const SIZE_LINE: i32 = 1;
    pub const DEPTH_INTO: i32 = 0;
    pub const DEPTH_OVER: i32 = 1;
    pub const DEPTH_OUT: i32 = 2;
}

/// Only the nominated thread runs while the invocation executes.
pub const INVOKE_SINGLE_THREADED: i32 = 1;

pub const ACC_STATIC: u32 = 0x0008;

/// ThreadReference.Status suspend bit.
pub const SUSPEND_STATUS_SUSPENDED: i32 = 0x1;

/// Error codes the engine dispatches on.
pub mod error_code {
    pub const INVALID_THREAD: u16 = 10;
    pub const THREAD_NOT_SUSPENDED: u16 = 13;
    pub const INVALID_OBJECT: u16 = 20;
    pub const INVALID_CLASS: u16 = 21;
    pub const CLASS_NOT_PREPARED: u16 = 22;
    pub const INVALID_FIELDID: u16 = 25;
    pub const INVALID_FRAMEID: u16 = 30;
    pub const INVALID_SLOT: u16 = 35;
    pub const ABSENT_INFORMATION: u16 = 101;
    pub const VM_DEAD: u16 = 112;
    pub const ALREADY_INVOKING: u16 = 502;
}

/// Human-readable name for a JDWP error code, used in error display.
pub fn error_name(code: u16) -> &'static str {
    match code {
        10 => "INVALID_THREAD",
        11 => "INVALID_THREAD_GROUP",
        13 => "THREAD_NOT_SUSPENDED",
        14 => "THREAD_SUSPENDED",
        15 => "THREAD_NOT_ALIVE",
        20 => "INVALID_OBJECT",
        21 => "INVALID_CLASS",
        22 => "CLASS_NOT_PREPARED",
        23 => "INVALID_METHODID",
        24 => "INVALID_LOCATION",
        25 => "INVALID_FIELDID",
        30 => "INVALID_FRAMEID",
        31 => "NO_MORE_FRAMES",
        32 => "OPAQUE_FRAME",
        34 => "TYPE_MISMATCH",
        35 => "INVALID_SLOT",
        41 => "NOT_FOUND",
        60 => "INVALID_CLASS_FORMAT",
        61 => "CIRCULAR_CLASS_DEFINITION",
        62 => "FAILS_VERIFICATION",
        68 => "UNSUPPORTED_VERSION",
        99 => "NOT_IMPLEMENTED",
        100 => "NULL_POINTER",
        101 => "ABSENT_INFORMATION",
        103 => "ILLEGAL_ARGUMENT",
        110 => "OUT_OF_MEMORY",
        112 => "VM_DEAD",
        113 => "INTERNAL",
        500 => "INVALID_TAG",
        502 => "ALREADY_INVOKING",
        503 => "INVALID_INDEX",
        504 => "INVALID_LENGTH",
        506 => "INVALID_STRING",
        507 => "INVALID_CLASS_LOADER",
        508 => "INVALID_ARRAY",
        512 => "INVALID_COUNT",
        _ => "UNKNOWN",
    }
}

/// JDWP thread status values rendered for thread listings.
pub fn thread_status_name(status: i32) -> &'static str {
    match status {
        0 => "zombie",
        1 => "running",
        2 => "sleeping",
        3 => "monitor",
        4 => "wait",
        -1 => "not started",
        _ => "unknown",
    }
}
