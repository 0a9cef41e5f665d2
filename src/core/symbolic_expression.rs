//! Symbolic expressions: relocation-like operands attached at an address.
//!
//! An expression refers to one or two symbols by UUID plus an integer addend.
//! Modules keep them in address order.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How the expression's value is formed at the use site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    /// Absolute address of the symbol
    #[default]
    Absolute,
    /// Relative to program counter
    PcRelative,
    /// Offset from the Global Offset Table
    GotRelative,
    /// PC-relative reference to a GOT entry
    GotPcRelative,
    /// Reference through a Procedure Linkage Table entry
    PltRelative,
    /// Thread-local storage offset
    TlsOffset,
}

impl ExprKind {
    pub fn to_wire(self) -> u32 {
        match self {
            ExprKind::Absolute => 0,
            ExprKind::PcRelative => 1,
            ExprKind::GotRelative => 2,
            ExprKind::GotPcRelative => 3,
            ExprKind::PltRelative => 4,
            ExprKind::TlsOffset => 5,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(ExprKind::Absolute),
            1 => Some(ExprKind::PcRelative),
            2 => Some(ExprKind::GotRelative),
            3 => Some(ExprKind::GotPcRelative),
            4 => Some(ExprKind::PltRelative),
            5 => Some(ExprKind::TlsOffset),
            _ => None,
        }
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Absolute => write!(f, "Absolute"),
            ExprKind::PcRelative => write!(f, "PcRelative"),
            ExprKind::GotRelative => write!(f, "GotRelative"),
            ExprKind::GotPcRelative => write!(f, "GotPcRelative"),
            ExprKind::PltRelative => write!(f, "PltRelative"),
            ExprKind::TlsOffset => write!(f, "TlsOffset"),
        }
    }
}

/// A symbolic operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolicExpression {
    /// `symbol + offset`
    AddrConst {
        kind: ExprKind,
        symbol: Uuid,
        offset: i64,
    },
    /// `(symbol1 - symbol2) / scale + offset`
    AddrAddr {
        kind: ExprKind,
        scale: i64,
        offset: i64,
        symbol1: Uuid,
        symbol2: Uuid,
    },
    /// Stack-frame offset, optionally named by a symbol
    StackConst {
        kind: ExprKind,
        symbol: Option<Uuid>,
        offset: i64,
    },
}

impl SymbolicExpression {
    pub fn addr_const(symbol: Uuid, offset: i64) -> Self {
        SymbolicExpression::AddrConst {
            kind: ExprKind::Absolute,
            symbol,
            offset,
        }
    }

    pub fn addr_addr(symbol1: Uuid, symbol2: Uuid, scale: i64, offset: i64) -> Self {
        SymbolicExpression::AddrAddr {
            kind: ExprKind::Absolute,
            scale,
            offset,
            symbol1,
            symbol2,
        }
    }

    pub fn stack_const(symbol: Option<Uuid>, offset: i64) -> Self {
        SymbolicExpression::StackConst {
            kind: ExprKind::Absolute,
            symbol,
            offset,
        }
    }

    pub fn with_kind(mut self, new_kind: ExprKind) -> Self {
        match &mut self {
            SymbolicExpression::AddrConst { kind, .. }
            | SymbolicExpression::AddrAddr { kind, .. }
            | SymbolicExpression::StackConst { kind, .. } => *kind = new_kind,
        }
        self
    }

    pub fn kind(&self) -> ExprKind {
        match self {
            SymbolicExpression::AddrConst { kind, .. }
            | SymbolicExpression::AddrAddr { kind, .. }
            | SymbolicExpression::StackConst { kind, .. } => *kind,
        }
    }

    /// The integer addend.
    pub fn offset(&self) -> i64 {
        match self {
            SymbolicExpression::AddrConst { offset, .. }
            | SymbolicExpression::AddrAddr { offset, .. }
            | SymbolicExpression::StackConst { offset, .. } => *offset,
        }
    }

    /// UUIDs of the symbols the expression refers to.
    pub fn symbols(&self) -> Vec<Uuid> {
        match self {
            SymbolicExpression::AddrConst { symbol, .. } => vec![*symbol],
            SymbolicExpression::AddrAddr {
                symbol1, symbol2, ..
            } => vec![*symbol1, *symbol2],
            SymbolicExpression::StackConst { symbol, .. } => symbol.iter().copied().collect(),
        }
    }
}
