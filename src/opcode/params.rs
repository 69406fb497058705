//! Argument typing and marshaling between caller and callee register files.
//!
//! Dalvik registers are untyped: `const/4 v0, 0x0` may be `false`, `(short) 0`,
//! `0` or `null` depending on how the value is used. Before a call the
//! resolver settles on a type for every argument:
//!
//! - primitives (and arrays of primitives) take the declared parameter type,
//!   which is at least as specific as whatever the constant looked like
//! - references keep their own type when it is a subtype of the declared
//!   parameter, since it is more specific than the signature
//! - anything else (including types missing from the catalog) takes the
//!   declared type

use crate::{
    context::{HeapItem, MethodState, Value},
    types::{
        name::{self, TypeName},
        ClassManager, VirtualMethod,
    },
};

/// Chooses the type `item` is passed as for a parameter declared `declared`.
///
/// # Example
///
/// ```rust
/// use smaliscope::{
///     context::HeapItem,
///     opcode::reconcile_type,
///     types::{ClassManager, VirtualType},
/// };
///
/// let classes = ClassManager::new();
/// classes.register(VirtualType::new("Lapp/Parent;"));
/// classes.register(VirtualType::new("Lapp/Child;").extends("Lapp/Parent;"));
///
/// let child = HeapItem::unknown("Lapp/Child;");
/// assert_eq!(&*reconcile_type(&classes, &child, &"Lapp/Parent;".into()), "Lapp/Child;");
/// assert_eq!(&*reconcile_type(&classes, &HeapItem::int(1), &"Z".into()), "Z");
/// ```
#[must_use]
pub fn reconcile_type(classes: &ClassManager, item: &HeapItem, declared: &TypeName) -> TypeName {
    if item.is_primitive_or_primitive_array() {
        return declared.clone();
    }

    let base = name::component_base(item.type_name());
    match classes.ancestors(base) {
        Ok(chain) if chain.contains(declared) => item.type_name().clone(),
        Ok(_) => declared.clone(),
        Err(error) => {
            log::trace!(
                "Cannot resolve ancestors of {}, passing as {}: {}",
                base,
                declared,
                error
            );
            declared.clone()
        }
    }
}

/// Reconciles every argument of a call.
///
/// `registers` holds one caller register per declared parameter of `method`.
/// Each register is read (and recorded as read) from `caller`.
pub(crate) fn reconcile_arguments(
    classes: &ClassManager,
    method: &VirtualMethod,
    registers: &[u16],
    caller: &mut MethodState,
) -> Vec<TypeName> {
    method
        .parameter_types()
        .iter()
        .zip(registers)
        .map(|(declared, &register)| {
            let item = caller.read_register(register);
            reconcile_type(classes, &item, declared)
        })
        .collect()
}

/// Converts a caller item into the value passed for a parameter of type
/// `parameter_type`.
fn marshal(item: &HeapItem, parameter_type: &TypeName) -> HeapItem {
    if item.is_primitive() && !item.is_unknown() {
        let is_zero_int = &**item.type_name() == "I" && item.value().as_i64() == Some(0);
        if is_zero_int && name::is_object(parameter_type) {
            return HeapItem::new(Value::Null, parameter_type.clone());
        }
        return item.cast_to_primitive(parameter_type);
    }
    item.retyped(parameter_type.clone())
}

/// Copies the call's arguments from `caller` into the parameter region of
/// `callee`, wide types advancing two registers.
pub(crate) fn marshal_arguments(
    registers: &[u16],
    reconciled: &[TypeName],
    caller: &mut MethodState,
    callee: &mut MethodState,
) {
    let mut offset = 0u16;
    for (&register, parameter_type) in registers.iter().zip(reconciled) {
        let item = caller.read_register(register);
        callee.assign_parameter(offset, marshal(&item, parameter_type));
        offset += name::register_size(parameter_type);
    }
}

/// Returns `true` if no parameter of `method` in `state` is unknown.
pub(crate) fn all_arguments_known(method: &VirtualMethod, state: &MethodState) -> bool {
    method
        .parameter_offsets()
        .all(|(offset, _)| !state.peek_parameter(offset).is_unknown())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{Heap, InstanceRef},
        types::{MethodFlags, VirtualType},
    };

    fn classes() -> ClassManager {
        let classes = ClassManager::new();
        classes.register(VirtualType::new(name::OBJECT).framework());
        classes.register(VirtualType::new("Lapp/Shape;").extends(name::OBJECT));
        classes.register(
            VirtualType::new("Lapp/Circle;")
                .extends("Lapp/Shape;")
                .implements("Lapp/Round;"),
        );
        classes.register(VirtualType::new("Lapp/Round;"));
        classes
    }

    #[test]
    fn test_primitive_takes_declared_type() {
        let classes = classes();
        let declared: TypeName = "Z".into();
        assert_eq!(reconcile_type(&classes, &HeapItem::int(1), &declared), declared);
        let array: TypeName = "[B".into();
        assert_eq!(
            reconcile_type(&classes, &HeapItem::unknown("[I"), &array),
            array
        );
    }

    #[test]
    fn test_more_specific_reference_kept() {
        let classes = classes();
        let circle = HeapItem::unknown("Lapp/Circle;");
        assert_eq!(
            &*reconcile_type(&classes, &circle, &"Lapp/Shape;".into()),
            "Lapp/Circle;"
        );
        assert_eq!(
            &*reconcile_type(&classes, &circle, &"Lapp/Round;".into()),
            "Lapp/Circle;"
        );
        assert_eq!(
            &*reconcile_type(&classes, &circle, &name::OBJECT.into()),
            "Lapp/Circle;"
        );
    }

    #[test]
    fn test_less_specific_reference_replaced() {
        let classes = classes();
        let shape = HeapItem::unknown("Lapp/Shape;");
        assert_eq!(
            &*reconcile_type(&classes, &shape, &"Lapp/Circle;".into()),
            "Lapp/Circle;"
        );
        let unregistered = HeapItem::unknown("Lother/Thing;");
        assert_eq!(
            &*reconcile_type(&classes, &unregistered, &"Lapp/Shape;".into()),
            "Lapp/Shape;"
        );
    }

    #[test]
    fn test_marshal_zero_to_object_is_null() {
        let item = marshal(&HeapItem::int(0), &"Lapp/Shape;".into());
        assert!(item.is_null());
        assert_eq!(&**item.type_name(), "Lapp/Shape;");

        let flag = marshal(&HeapItem::int(0), &"Z".into());
        assert_eq!(flag.value(), Value::Boolean(false));

        let unknown = marshal(&HeapItem::unknown("I"), &"Lapp/Shape;".into());
        assert!(unknown.is_unknown());
        assert_eq!(&**unknown.type_name(), "Lapp/Shape;");
    }

    #[test]
    fn test_marshal_wide_offsets() {
        let method = VirtualMethod::new("Lapp/M;->f(JLapp/Shape;I)V", MethodFlags::STATIC).unwrap();
        let heap = Heap::default();
        let shape = heap.alloc(crate::context::Instance::Object("Lapp/Shape;".into())).unwrap();

        let mut caller = MethodState::new(6, 0);
        caller.assign_register(0, HeapItem::new(Value::Long(7), "J"));
        caller.assign_register(2, HeapItem::reference(shape, "Lapp/Shape;"));
        caller.assign_register(3, HeapItem::int(300));
        let registers = [0, 2, 3];

        let classes = classes();
        let reconciled = reconcile_arguments(&classes, &method, &registers, &mut caller);
        let mut callee = MethodState::for_parameters(&method);
        marshal_arguments(&registers, &reconciled, &mut caller, &mut callee);

        assert_eq!(callee.register_count(), 4);
        assert_eq!(callee.peek_parameter(0).value(), Value::Long(7));
        assert_eq!(callee.peek_parameter(2).reference_handle(), Some(InstanceRef::new(0)));
        assert_eq!(callee.peek_parameter(3), HeapItem::int(300));
        assert!(all_arguments_known(&method, &callee));
        assert_eq!(caller.registers_read().len(), 3);
    }

    #[test]
    fn test_unknown_argument_detected() {
        let method = VirtualMethod::new("Lapp/M;->f(II)V", MethodFlags::STATIC).unwrap();
        let mut state = MethodState::for_parameters(&method);
        state.assign_parameter(0, HeapItem::int(1));
        assert!(!all_arguments_known(&method, &state));
        state.assign_parameter(1, HeapItem::null());
        assert!(all_arguments_known(&method, &state));
    }
}
