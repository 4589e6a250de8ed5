// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opcode catalog for the target stack VM.
//!
//! This is the single source of truth for instruction byte values and operand
//! layouts. Everything downstream (emitter, resolver, disassembler, artifact
//! tooling) consumes this table; nothing else is allowed to hardcode a byte
//! value or an operand width.

/// Operand layout for an instruction.
///
/// Widths are fixed by the VM wire format. `Data1`/`Data2`/`Data4` carry a
/// length prefix of the given width followed by that many payload bytes;
/// everything else is a fixed-width operand (possibly zero bytes).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandEncoding {
    /// No operand.
    None,
    /// 1-byte signed immediate.
    I8,
    /// 2-byte signed immediate, little-endian.
    I16,
    /// 4-byte signed immediate, little-endian.
    I32,
    /// 8-byte signed immediate, little-endian.
    I64,
    /// 16-byte signed immediate, little-endian.
    I128,
    /// 32-byte signed immediate, little-endian.
    I256,
    /// 1-byte unsigned immediate (slot index, type tag).
    U8,
    /// 2-byte unsigned immediate, little-endian (method-token id).
    U16,
    /// 4-byte unsigned immediate, little-endian (interop service id).
    U32,
    /// 1-byte length prefix followed by that many payload bytes.
    Data1,
    /// 2-byte little-endian length prefix followed by payload.
    Data2,
    /// 4-byte little-endian length prefix followed by payload.
    Data4,
    /// 1-byte signed branch displacement.
    Off8,
    /// 4-byte signed branch displacement, little-endian.
    Off32,
    /// Two 1-byte signed displacements (catch, finally) for a try region.
    Off8x2,
    /// Two 4-byte signed displacements (catch, finally) for a try region.
    Off32x2,
    /// Two 1-byte unsigned counts: local slots, then argument slots.
    SlotPair,
}

impl OperandEncoding {
    /// Returns the operand width in bytes, or `None` for length-prefixed data
    /// (whose total width depends on the payload).
    #[must_use]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Self::None => Some(0),
            Self::I8 | Self::U8 | Self::Off8 => Some(1),
            Self::I16 | Self::U16 | Self::Off8x2 | Self::SlotPair => Some(2),
            Self::I32 | Self::U32 | Self::Off32 => Some(4),
            Self::I64 | Self::Off32x2 => Some(8),
            Self::I128 => Some(16),
            Self::I256 => Some(32),
            Self::Data1 | Self::Data2 | Self::Data4 => None,
        }
    }

    /// Returns true if the operand carries one or more branch displacements.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(self, Self::Off8 | Self::Off32 | Self::Off8x2 | Self::Off32x2)
    }
}

macro_rules! opcode_flag {
    () => {
        false
    };
    (term) => {
        true
    };
}

macro_rules! define_opcodes {
    ($( $byte:literal $name:ident $mn:literal $enc:ident $($flag:ident)? ; )+) => {
        /// A VM instruction's numeric code.
        ///
        /// Byte values are part of the wire format and never change; the
        /// `opcode_values_are_stable` test locks a representative sample.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                #[doc = concat!("`", $mn, "`.")]
                $name = $byte,
            )+
        }

        /// Every opcode in the catalog, in ascending byte order.
        pub const ALL_OPCODES: &[Opcode] = &[$(Opcode::$name),+];

        impl Opcode {
            /// Parses an opcode from its byte value.
            #[must_use]
            pub const fn from_byte(b: u8) -> Option<Self> {
                match b {
                    $( $byte => Some(Self::$name), )+
                    _ => None,
                }
            }

            /// Returns the assembler mnemonic.
            #[must_use]
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Self::$name => $mn, )+
                }
            }

            /// Returns the operand layout.
            #[must_use]
            pub const fn operand_encoding(self) -> OperandEncoding {
                match self {
                    $( Self::$name => OperandEncoding::$enc, )+
                }
            }

            /// Returns true if control never falls through to the next
            /// instruction.
            #[must_use]
            pub const fn is_terminator(self) -> bool {
                match self {
                    $( Self::$name => opcode_flag!($($flag)?), )+
                }
            }
        }
    };
}

define_opcodes! {
    0x00 PushInt8    "pushint8"    I8;
    0x01 PushInt16   "pushint16"   I16;
    0x02 PushInt32   "pushint32"   I32;
    0x03 PushInt64   "pushint64"   I64;
    0x04 PushInt128  "pushint128"  I128;
    0x05 PushInt256  "pushint256"  I256;
    0x08 PushTrue    "pusht"       None;
    0x09 PushFalse   "pushf"       None;
    0x0A PushA       "pusha"       I32;
    0x0B PushNull    "pushnull"    None;
    0x0C PushData1   "pushdata1"   Data1;
    0x0D PushData2   "pushdata2"   Data2;
    0x0E PushData4   "pushdata4"   Data4;
    0x0F PushM1      "pushm1"      None;
    0x10 Push0       "push0"       None;
    0x11 Push1       "push1"       None;
    0x12 Push2       "push2"       None;
    0x13 Push3       "push3"       None;
    0x14 Push4       "push4"       None;
    0x15 Push5       "push5"       None;
    0x16 Push6       "push6"       None;
    0x17 Push7       "push7"       None;
    0x18 Push8       "push8"       None;
    0x19 Push9       "push9"       None;
    0x1A Push10      "push10"      None;
    0x1B Push11      "push11"      None;
    0x1C Push12      "push12"      None;
    0x1D Push13      "push13"      None;
    0x1E Push14      "push14"      None;
    0x1F Push15      "push15"      None;
    0x20 Push16      "push16"      None;
    0x21 Nop         "nop"         None;
    0x22 Jmp         "jmp"         Off8    term;
    0x23 JmpL        "jmp_l"       Off32   term;
    0x24 JmpIf       "jmpif"       Off8;
    0x25 JmpIfL      "jmpif_l"     Off32;
    0x26 JmpIfNot    "jmpifnot"    Off8;
    0x27 JmpIfNotL   "jmpifnot_l"  Off32;
    0x28 JmpEq       "jmpeq"       Off8;
    0x29 JmpEqL      "jmpeq_l"     Off32;
    0x2A JmpNe       "jmpne"       Off8;
    0x2B JmpNeL      "jmpne_l"     Off32;
    0x2C JmpGt       "jmpgt"       Off8;
    0x2D JmpGtL      "jmpgt_l"     Off32;
    0x2E JmpGe       "jmpge"       Off8;
    0x2F JmpGeL      "jmpge_l"     Off32;
    0x30 JmpLt       "jmplt"       Off8;
    0x31 JmpLtL      "jmplt_l"     Off32;
    0x32 JmpLe       "jmple"       Off8;
    0x33 JmpLeL      "jmple_l"     Off32;
    0x34 Call        "call"        Off8;
    0x35 CallL       "call_l"      Off32;
    0x36 CallA       "calla"       None;
    0x37 CallT       "callt"       U16;
    0x38 Abort       "abort"       None    term;
    0x39 Assert      "assert"      None;
    0x3A Throw       "throw"       None    term;
    0x3B Try         "try"         Off8x2;
    0x3C TryL        "try_l"       Off32x2;
    0x3D EndTry      "endtry"      Off8    term;
    0x3E EndTryL     "endtry_l"    Off32   term;
    0x3F EndFinally  "endfinally"  None    term;
    0x40 Ret         "ret"         None    term;
    0x41 Syscall     "syscall"     U32;
    0x43 Depth       "depth"       None;
    0x45 Drop        "drop"        None;
    0x46 Nip         "nip"         None;
    0x48 XDrop       "xdrop"       None;
    0x49 Clear       "clear"       None;
    0x4A Dup         "dup"         None;
    0x4B Over        "over"        None;
    0x4D Pick        "pick"        None;
    0x4E Tuck        "tuck"        None;
    0x50 Swap        "swap"        None;
    0x51 Rot         "rot"         None;
    0x52 Roll        "roll"        None;
    0x53 Reverse3    "reverse3"    None;
    0x54 Reverse4    "reverse4"    None;
    0x55 ReverseN    "reversen"    None;
    0x56 InitSSlot   "initsslot"   U8;
    0x57 InitSlot    "initslot"    SlotPair;
    0x58 LdSFld0     "ldsfld0"     None;
    0x59 LdSFld1     "ldsfld1"     None;
    0x5A LdSFld2     "ldsfld2"     None;
    0x5B LdSFld3     "ldsfld3"     None;
    0x5C LdSFld4     "ldsfld4"     None;
    0x5D LdSFld5     "ldsfld5"     None;
    0x5E LdSFld6     "ldsfld6"     None;
    0x5F LdSFld      "ldsfld"      U8;
    0x60 StSFld0     "stsfld0"     None;
    0x61 StSFld1     "stsfld1"     None;
    0x62 StSFld2     "stsfld2"     None;
    0x63 StSFld3     "stsfld3"     None;
    0x64 StSFld4     "stsfld4"     None;
    0x65 StSFld5     "stsfld5"     None;
    0x66 StSFld6     "stsfld6"     None;
    0x67 StSFld      "stsfld"      U8;
    0x68 LdLoc0      "ldloc0"      None;
    0x69 LdLoc1      "ldloc1"      None;
    0x6A LdLoc2      "ldloc2"      None;
    0x6B LdLoc3      "ldloc3"      None;
    0x6C LdLoc4      "ldloc4"      None;
    0x6D LdLoc5      "ldloc5"      None;
    0x6E LdLoc6      "ldloc6"      None;
    0x6F LdLoc       "ldloc"       U8;
    0x70 StLoc0      "stloc0"      None;
    0x71 StLoc1      "stloc1"      None;
    0x72 StLoc2      "stloc2"      None;
    0x73 StLoc3      "stloc3"      None;
    0x74 StLoc4      "stloc4"      None;
    0x75 StLoc5      "stloc5"      None;
    0x76 StLoc6      "stloc6"      None;
    0x77 StLoc       "stloc"       U8;
    0x78 LdArg0      "ldarg0"      None;
    0x79 LdArg1      "ldarg1"      None;
    0x7A LdArg2      "ldarg2"      None;
    0x7B LdArg3      "ldarg3"      None;
    0x7C LdArg4      "ldarg4"      None;
    0x7D LdArg5      "ldarg5"      None;
    0x7E LdArg6      "ldarg6"      None;
    0x7F LdArg       "ldarg"       U8;
    0x80 StArg0      "starg0"      None;
    0x81 StArg1      "starg1"      None;
    0x82 StArg2      "starg2"      None;
    0x83 StArg3      "starg3"      None;
    0x84 StArg4      "starg4"      None;
    0x85 StArg5      "starg5"      None;
    0x86 StArg6      "starg6"      None;
    0x87 StArg       "starg"       U8;
    0x88 NewBuffer   "newbuffer"   None;
    0x89 Memcpy      "memcpy"      None;
    0x8B Cat         "cat"         None;
    0x8C SubStr      "substr"      None;
    0x8D Left        "left"        None;
    0x8E Right       "right"       None;
    0x90 Invert      "invert"      None;
    0x91 And         "and"         None;
    0x92 Or          "or"          None;
    0x93 Xor         "xor"         None;
    0x97 Equal       "equal"       None;
    0x98 NotEqual    "notequal"    None;
    0x99 Sign        "sign"        None;
    0x9A Abs         "abs"         None;
    0x9B Negate      "negate"      None;
    0x9C Inc         "inc"         None;
    0x9D Dec         "dec"         None;
    0x9E Add         "add"         None;
    0x9F Sub         "sub"         None;
    0xA0 Mul         "mul"         None;
    0xA1 Div         "div"         None;
    0xA2 Mod         "mod"         None;
    0xA3 Pow         "pow"         None;
    0xA4 Sqrt        "sqrt"        None;
    0xA5 ModMul      "modmul"      None;
    0xA6 ModPow      "modpow"      None;
    0xA8 Shl         "shl"         None;
    0xA9 Shr         "shr"         None;
    0xAA Not         "not"         None;
    0xAB BoolAnd     "booland"     None;
    0xAC BoolOr      "boolor"      None;
    0xB1 Nz          "nz"          None;
    0xB3 NumEqual    "numequal"    None;
    0xB4 NumNotEqual "numnotequal" None;
    0xB5 Lt          "lt"          None;
    0xB6 Le          "le"          None;
    0xB7 Gt          "gt"          None;
    0xB8 Ge          "ge"          None;
    0xB9 Min         "min"         None;
    0xBA Max         "max"         None;
    0xBB Within      "within"      None;
    0xBE PackMap     "packmap"     None;
    0xBF PackStruct  "packstruct"  None;
    0xC0 Pack        "pack"        None;
    0xC1 Unpack      "unpack"      None;
    0xC2 NewArray0   "newarray0"   None;
    0xC3 NewArray    "newarray"    None;
    0xC4 NewArrayT   "newarray_t"  U8;
    0xC5 NewStruct0  "newstruct0"  None;
    0xC6 NewStruct   "newstruct"   None;
    0xC8 NewMap      "newmap"      None;
    0xCA Size        "size"        None;
    0xCB HasKey      "haskey"      None;
    0xCC Keys        "keys"        None;
    0xCD Values      "values"      None;
    0xCE PickItem    "pickitem"    None;
    0xCF Append      "append"      None;
    0xD0 SetItem     "setitem"     None;
    0xD1 ReverseItems "reverseitems" None;
    0xD2 Remove      "remove"      None;
    0xD3 ClearItems  "clearitems"  None;
    0xD4 PopItem     "popitem"     None;
    0xD8 IsNull      "isnull"      None;
    0xD9 IsType      "istype"      U8;
    0xDB Convert     "convert"     U8;
}

impl Opcode {
    /// Returns the opcode byte value.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Returns true if the instruction carries branch displacements.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        self.operand_encoding().is_branch()
    }

    /// Returns the 4-byte-displacement form of a short branch opcode.
    #[must_use]
    pub const fn long_form(self) -> Option<Self> {
        match self {
            Self::Jmp => Some(Self::JmpL),
            Self::JmpIf => Some(Self::JmpIfL),
            Self::JmpIfNot => Some(Self::JmpIfNotL),
            Self::JmpEq => Some(Self::JmpEqL),
            Self::JmpNe => Some(Self::JmpNeL),
            Self::JmpGt => Some(Self::JmpGtL),
            Self::JmpGe => Some(Self::JmpGeL),
            Self::JmpLt => Some(Self::JmpLtL),
            Self::JmpLe => Some(Self::JmpLeL),
            Self::Call => Some(Self::CallL),
            Self::Try => Some(Self::TryL),
            Self::EndTry => Some(Self::EndTryL),
            _ => None,
        }
    }

    /// Returns the 1-byte-displacement form of a long branch opcode.
    #[must_use]
    pub const fn short_form(self) -> Option<Self> {
        match self {
            Self::JmpL => Some(Self::Jmp),
            Self::JmpIfL => Some(Self::JmpIf),
            Self::JmpIfNotL => Some(Self::JmpIfNot),
            Self::JmpEqL => Some(Self::JmpEq),
            Self::JmpNeL => Some(Self::JmpNe),
            Self::JmpGtL => Some(Self::JmpGt),
            Self::JmpGeL => Some(Self::JmpGe),
            Self::JmpLtL => Some(Self::JmpLt),
            Self::JmpLeL => Some(Self::JmpLe),
            Self::CallL => Some(Self::Call),
            Self::TryL => Some(Self::Try),
            Self::EndTryL => Some(Self::EndTry),
            _ => None,
        }
    }

    /// Compact slot-load opcode for a local slot (wide form above slot 6).
    #[must_use]
    pub const fn load_local(slot: u8) -> Self {
        match slot {
            0 => Self::LdLoc0,
            1 => Self::LdLoc1,
            2 => Self::LdLoc2,
            3 => Self::LdLoc3,
            4 => Self::LdLoc4,
            5 => Self::LdLoc5,
            6 => Self::LdLoc6,
            _ => Self::LdLoc,
        }
    }

    /// Compact slot-store opcode for a local slot.
    #[must_use]
    pub const fn store_local(slot: u8) -> Self {
        match slot {
            0 => Self::StLoc0,
            1 => Self::StLoc1,
            2 => Self::StLoc2,
            3 => Self::StLoc3,
            4 => Self::StLoc4,
            5 => Self::StLoc5,
            6 => Self::StLoc6,
            _ => Self::StLoc,
        }
    }

    /// Compact slot-load opcode for an argument slot.
    #[must_use]
    pub const fn load_arg(slot: u8) -> Self {
        match slot {
            0 => Self::LdArg0,
            1 => Self::LdArg1,
            2 => Self::LdArg2,
            3 => Self::LdArg3,
            4 => Self::LdArg4,
            5 => Self::LdArg5,
            6 => Self::LdArg6,
            _ => Self::LdArg,
        }
    }

    /// Compact slot-store opcode for an argument slot.
    #[must_use]
    pub const fn store_arg(slot: u8) -> Self {
        match slot {
            0 => Self::StArg0,
            1 => Self::StArg1,
            2 => Self::StArg2,
            3 => Self::StArg3,
            4 => Self::StArg4,
            5 => Self::StArg5,
            6 => Self::StArg6,
            _ => Self::StArg,
        }
    }

    /// Compact slot-load opcode for a static slot.
    #[must_use]
    pub const fn load_static(slot: u8) -> Self {
        match slot {
            0 => Self::LdSFld0,
            1 => Self::LdSFld1,
            2 => Self::LdSFld2,
            3 => Self::LdSFld3,
            4 => Self::LdSFld4,
            5 => Self::LdSFld5,
            6 => Self::LdSFld6,
            _ => Self::LdSFld,
        }
    }

    /// Compact slot-store opcode for a static slot.
    #[must_use]
    pub const fn store_static(slot: u8) -> Self {
        match slot {
            0 => Self::StSFld0,
            1 => Self::StSFld1,
            2 => Self::StSFld2,
            3 => Self::StSFld3,
            4 => Self::StSFld4,
            5 => Self::StSFld5,
            6 => Self::StSFld6,
            _ => Self::StSFld,
        }
    }
}
