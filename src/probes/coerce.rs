/*!
 * Type Coercion
 * Converts fire-time values into the word-sized slots the tracer reads
 *
 * Every string slot points into a `CString` owned by the same
 * [`ArgumentFrame`], so the pointers stay valid for exactly as long as the
 * frame does. The fire path keeps the frame alive across the native emit call
 * and drops it afterwards.
 */

use super::types::{ArgKind, ArgType, ArgValue, FiredArg};
use crate::config::CoercionPolicy;
use crate::core::limits::ARG_MAX;
use crate::core::{UsdtError, UsdtResult};
use std::ffi::{c_char, c_void, CStr, CString};
use std::fmt;

/// One argument word as handed to `usdt_fire_probe`
#[repr(C)]
#[derive(Clone, Copy)]
pub union ArgumentSlot {
    integer: i64,
    string: *const c_char,
}

/// What a slot currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Integer,
    Boolean,
    String,
}

/// Call-scoped argument vector with owned string storage
pub struct ArgumentFrame {
    slots: [ArgumentSlot; ARG_MAX],
    kinds: [SlotKind; ARG_MAX],
    len: usize,
    strings: Vec<CString>,
}

impl ArgumentFrame {
    pub fn new() -> Self {
        Self {
            slots: [ArgumentSlot { integer: 0 }; ARG_MAX],
            kinds: [SlotKind::Integer; ARG_MAX],
            len: 0,
            strings: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn kinds(&self) -> &[SlotKind] {
        &self.kinds[..self.len]
    }

    fn next_index(&self) -> UsdtResult<usize> {
        if self.len >= ARG_MAX {
            return Err(UsdtError::ArgumentLimitExceeded {
                count: self.len + 1,
                max: ARG_MAX,
            });
        }
        Ok(self.len)
    }

    pub fn push_int(&mut self, value: i64) -> UsdtResult<()> {
        let i = self.next_index()?;
        self.slots[i] = ArgumentSlot { integer: value };
        self.kinds[i] = SlotKind::Integer;
        self.len += 1;
        Ok(())
    }

    /// Booleans occupy the whole word as 0 or 1
    pub fn push_bool(&mut self, value: bool) -> UsdtResult<()> {
        let i = self.next_index()?;
        self.slots[i] = ArgumentSlot {
            integer: value as i64,
        };
        self.kinds[i] = SlotKind::Boolean;
        self.len += 1;
        Ok(())
    }

    /// Copy `value` into frame-owned storage, cut at the first NUL byte
    pub fn push_str(&mut self, value: &str) -> UsdtResult<()> {
        let i = self.next_index()?;
        let bytes = value.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let owned = CString::new(&bytes[..end]).unwrap_or_default();

        // The heap buffer does not move when the CString is pushed.
        self.slots[i] = ArgumentSlot {
            string: owned.as_ptr(),
        };
        self.strings.push(owned);
        self.kinds[i] = SlotKind::String;
        self.len += 1;
        Ok(())
    }

    /// Integer view of slot `index`, for integer and boolean slots
    pub fn int_at(&self, index: usize) -> Option<i64> {
        match self.kinds().get(index)? {
            // SAFETY: integer and boolean slots are written through `integer`.
            SlotKind::Integer | SlotKind::Boolean => Some(unsafe { self.slots[index].integer }),
            SlotKind::String => None,
        }
    }

    /// String view of slot `index`
    pub fn str_at(&self, index: usize) -> Option<&CStr> {
        match self.kinds().get(index)? {
            SlotKind::String => {
                // SAFETY: string slots point at a CString in `self.strings`,
                // which lives as long as `self`.
                Some(unsafe { CStr::from_ptr(self.slots[index].string) })
            }
            _ => None,
        }
    }

    /// Decode every slot, as a tracer would read it
    pub fn decode(&self) -> Vec<FiredArg> {
        (0..self.len)
            .map(|i| match self.kinds[i] {
                SlotKind::String => FiredArg::Str(
                    self.str_at(i)
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                ),
                _ => FiredArg::Int(self.int_at(i).unwrap_or_default()),
            })
            .collect()
    }

    /// Pointer to the slot array in the `void **argv` shape libusdt expects
    pub fn as_argv(&self) -> *mut *mut c_void {
        self.slots.as_ptr() as *mut *mut c_void
    }
}

impl Default for ArgumentFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ArgumentFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentFrame")
            .field("len", &self.len)
            .field("args", &self.decode())
            .finish()
    }
}

/// Runtime-type coercion: int32-representable numbers become integers,
/// everything else its string form
pub fn coerce(value: &ArgValue, frame: &mut ArgumentFrame) -> UsdtResult<()> {
    match value.as_int32() {
        Some(i) => frame.push_int(i as i64),
        None => match value {
            ArgValue::Str(s) => frame.push_str(s),
            other => frame.push_str(&other.to_string()),
        },
    }
}

/// Coerce `value` into the slot layout declared by `declared`
pub fn coerce_checked(
    index: usize,
    value: &ArgValue,
    declared: &ArgType,
    frame: &mut ArgumentFrame,
) -> UsdtResult<()> {
    match (declared.kind(), value) {
        (ArgKind::Integer, ArgValue::Int(i)) => frame.push_int(*i),
        (ArgKind::Integer, ArgValue::Bool(b)) => frame.push_bool(*b),
        (ArgKind::Integer, ArgValue::Float(f))
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
        {
            frame.push_int(*f as i64)
        }
        (ArgKind::String, ArgValue::Str(s)) => frame.push_str(s),
        (ArgKind::Opaque, _) => coerce(value, frame),
        (_, found) => Err(UsdtError::TypeMismatch {
            index,
            expected: declared.tag().into(),
            found: found.type_name().into(),
        }),
    }
}

/// Build the argument frame for one fire call
pub fn marshal(
    policy: CoercionPolicy,
    declared: &[ArgType],
    args: &[ArgValue],
) -> UsdtResult<ArgumentFrame> {
    if args.len() > ARG_MAX {
        return Err(UsdtError::ArgumentLimitExceeded {
            count: args.len(),
            max: ARG_MAX,
        });
    }

    let mut frame = ArgumentFrame::new();
    match policy {
        CoercionPolicy::Permissive => {
            for value in args {
                coerce(value, &mut frame)?;
            }
        }
        CoercionPolicy::Strict => {
            if args.len() != declared.len() {
                return Err(UsdtError::ArityMismatch {
                    declared: declared.len(),
                    supplied: args.len(),
                });
            }
            for (index, (value, ty)) in args.iter().zip(declared).enumerate() {
                coerce_checked(index, value, ty, &mut frame)?;
            }
        }
    }
    Ok(frame)
}
