bitflags::bitflags! {
    /// Per-column flags carried in `ColumnDefinition41`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u16 {
        const NOT_NULL = 1;
        const PRIMARY_KEY = 1 << 1;
        const UNIQUE_KEY = 1 << 2;
        const MULTIPLE_KEY = 1 << 3;
        const BLOB = 1 << 4;
        const UNSIGNED = 1 << 5;
        const ZEROFILL = 1 << 6;
        const BINARY = 1 << 7;
        const ENUM = 1 << 8;
        const AUTO_INCREMENT = 1 << 9;
        const TIMESTAMP = 1 << 10;
        const SET = 1 << 11;
        const NO_DEFAULT_VALUE = 1 << 12;
        const ON_UPDATE_NOW = 1 << 13;
        const PART_KEY = 1 << 14;
        const NUM = 1 << 15;
    }
}
