use std::sync::Arc;

use crate::{
    context::{Heap, HeapItem, Instance, MethodState, Value},
    reflect::{MethodReflector, ReflectionError},
    types::{name, VirtualMethod},
};

const STRING_LENGTH: &str = "Ljava/lang/String;->length()I";
const STRING_CONCAT: &str = "Ljava/lang/String;->concat(Ljava/lang/String;)Ljava/lang/String;";
const STRING_CHAR_AT: &str = "Ljava/lang/String;->charAt(I)C";
const STRING_EQUALS: &str = "Ljava/lang/String;->equals(Ljava/lang/Object;)Z";
const MATH_ABS: &str = "Ljava/lang/Math;->abs(I)I";
const MATH_MAX: &str = "Ljava/lang/Math;->max(II)I";
const INTEGER_TO_STRING: &str = "Ljava/lang/Integer;->toString(I)Ljava/lang/String;";

/// Pure `java.lang` methods computed natively.
///
/// # Example
///
/// ```rust
/// use smaliscope::{
///     context::{Heap, HeapItem, MethodState, Register, Value},
///     reflect::{BuiltinReflector, MethodReflector},
///     types::{MethodFlags, VirtualMethod},
/// };
///
/// let max = VirtualMethod::new("Ljava/lang/Math;->max(II)I", MethodFlags::STATIC)?;
/// let mut state = MethodState::for_parameters(&max);
/// state.assign_parameter(0, HeapItem::int(3));
/// state.assign_parameter(1, HeapItem::int(8));
///
/// BuiltinReflector.reflect(&max, &mut state, &Heap::default()).unwrap();
/// assert_eq!(state.peek(Register::Return).value(), Value::Int(8));
/// # Ok::<(), smaliscope::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinReflector;

impl BuiltinReflector {
    /// Signatures this reflector can run.
    pub const SIGNATURES: &'static [&'static str] = &[
        STRING_LENGTH,
        STRING_CONCAT,
        STRING_CHAR_AT,
        STRING_EQUALS,
        MATH_ABS,
        MATH_MAX,
        INTEGER_TO_STRING,
    ];
}

struct Arguments<'a> {
    method: &'a VirtualMethod,
    state: &'a MethodState,
    heap: &'a Heap,
}

impl Arguments<'_> {
    fn invalid(&self, index: usize) -> ReflectionError {
        ReflectionError::InvalidArgument {
            signature: self.method.signature().to_string(),
            index,
        }
    }

    fn item(&self, index: usize) -> Result<HeapItem, ReflectionError> {
        let (offset, _) = self
            .method
            .parameter_offsets()
            .nth(index)
            .ok_or_else(|| self.invalid(index))?;
        let item = self.state.peek_parameter(offset);
        if item.is_unknown() {
            return Err(self.invalid(index));
        }
        Ok(item)
    }

    fn int(&self, index: usize) -> Result<i32, ReflectionError> {
        self.item(index)?
            .value()
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| self.invalid(index))
    }

    /// String contents, `None` for `null`.
    fn string(&self, index: usize) -> Result<Option<Arc<str>>, ReflectionError> {
        let item = self.item(index)?;
        if item.is_null() {
            return Ok(None);
        }
        let handle = item.reference_handle().ok_or_else(|| self.invalid(index))?;
        match self.heap.get(handle) {
            Ok(Instance::String(text)) => Ok(Some(text)),
            _ => Err(self.invalid(index)),
        }
    }

    fn receiver(&self) -> Result<Arc<str>, ReflectionError> {
        self.string(0)?.ok_or_else(|| thrown("Ljava/lang/NullPointerException;", ""))
    }

    fn alloc_string(&self, text: &str) -> Result<HeapItem, ReflectionError> {
        self.heap
            .alloc_string(text)
            .map(|handle| HeapItem::reference(handle, name::STRING))
            .map_err(|error| thrown("Ljava/lang/OutOfMemoryError;", &error.to_string()))
    }
}

fn thrown(exception_class: &str, message: &str) -> ReflectionError {
    ReflectionError::Thrown {
        exception_class: exception_class.to_string(),
        message: message.to_string(),
    }
}

impl MethodReflector for BuiltinReflector {
    fn reflect(
        &self,
        method: &VirtualMethod,
        state: &mut MethodState,
        heap: &Heap,
    ) -> Result<(), ReflectionError> {
        let args = Arguments {
            method,
            state,
            heap,
        };

        let result = match method.signature() {
            STRING_LENGTH => {
                let text = args.receiver()?;
                let length = i32::try_from(text.encode_utf16().count()).unwrap_or(i32::MAX);
                HeapItem::int(length)
            }
            STRING_CONCAT => {
                let text = args.receiver()?;
                let Some(suffix) = args.string(1)? else {
                    return Err(thrown("Ljava/lang/NullPointerException;", ""));
                };
                args.alloc_string(&format!("{text}{suffix}"))?
            }
            STRING_CHAR_AT => {
                let text = args.receiver()?;
                let index = args.int(1)?;
                let units: Vec<u16> = text.encode_utf16().collect();
                let unit = usize::try_from(index)
                    .ok()
                    .and_then(|i| units.get(i).copied())
                    .ok_or_else(|| {
                        thrown(
                            "Ljava/lang/StringIndexOutOfBoundsException;",
                            &format!("index {index}, length {}", units.len()),
                        )
                    })?;
                HeapItem::new(Value::Char(unit), "C")
            }
            STRING_EQUALS => {
                let text = args.receiver()?;
                let other = args.item(1)?;
                let equal = match other.reference_handle().map(|handle| heap.get(handle)) {
                    Some(Ok(Instance::String(other))) => other == text,
                    _ => false,
                };
                HeapItem::new(Value::Boolean(equal), "Z")
            }
            MATH_ABS => HeapItem::int(args.int(0)?.wrapping_abs()),
            MATH_MAX => HeapItem::int(args.int(0)?.max(args.int(1)?)),
            INTEGER_TO_STRING => args.alloc_string(&args.int(0)?.to_string())?,
            other => return Err(ReflectionError::Unsupported(other.to_string())),
        };

        state.assign_return_register(result);
        Ok(())
    }
}
