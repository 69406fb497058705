//! `java.lang` emulation handlers.

use std::sync::Arc;

use crate::{
    context::{ExecutionContext, HeapItem, Instance, InstanceRef, SideEffect, VirtualException},
    emulate::{EmulatedMethod, EmulationResult, MethodEmulator},
    types::name,
    vm::VirtualMachine,
    Result,
};

const NULL_POINTER: &str = "Ljava/lang/NullPointerException;";
const NUMBER_FORMAT: &str = "Ljava/lang/NumberFormatException;";

/// Registers all built-in `java.lang` handlers.
pub fn register(emulator: &mut MethodEmulator) {
    emulator.register(EmulatedMethod::new(
        "Ljava/lang/Object;->getClass()Ljava/lang/Class;",
        object_get_class,
    ));
    emulator.register(EmulatedMethod::new(
        "Ljava/lang/String;-><init>(Ljava/lang/String;)V",
        string_init_string,
    ));
    emulator.register(EmulatedMethod::new(
        "Ljava/lang/StringBuilder;-><init>()V",
        builder_init,
    ));
    emulator.register(EmulatedMethod::new(
        "Ljava/lang/StringBuilder;-><init>(Ljava/lang/String;)V",
        builder_init_string,
    ));
    emulator.register(EmulatedMethod::new(
        "Ljava/lang/StringBuilder;->append(Ljava/lang/String;)Ljava/lang/StringBuilder;",
        builder_append_string,
    ));
    emulator.register(EmulatedMethod::new(
        "Ljava/lang/StringBuilder;->append(I)Ljava/lang/StringBuilder;",
        builder_append_int,
    ));
    emulator.register(EmulatedMethod::new(
        "Ljava/lang/StringBuilder;->toString()Ljava/lang/String;",
        builder_to_string,
    ));
    emulator.register(EmulatedMethod::new(
        "Ljava/lang/Integer;->parseInt(Ljava/lang/String;)I",
        integer_parse_int,
    ));
}

/// Argument `index` in declaration order, receiver first.
fn argument(context: &ExecutionContext, index: usize) -> HeapItem {
    let offset = context
        .method()
        .parameter_offsets()
        .nth(index)
        .map_or(0, |(offset, _)| offset);
    context.state().peek_parameter(offset)
}

/// Contents of a string argument, `None` for `null` or a non-string.
fn string_argument(context: &ExecutionContext, index: usize) -> Result<Option<Arc<str>>> {
    match argument(context, index).reference_handle() {
        Some(handle) => context.heap().get_string(handle),
        None => Ok(None),
    }
}

fn builder_receiver(context: &ExecutionContext) -> Result<(InstanceRef, String)> {
    let receiver = argument(context, 0);
    let Some(handle) = receiver.reference_handle() else {
        return Err(malformed_error!(
            "StringBuilder receiver is not a reference - {}",
            receiver
        ));
    };
    match context.heap().get(handle)? {
        Instance::StringBuilder(contents) => Ok((handle, contents)),
        other => Err(malformed_error!(
            "StringBuilder receiver holds {}",
            other
        )),
    }
}

fn replace_receiver(context: &mut ExecutionContext, item: HeapItem) {
    let receiver = context.state().parameter_start();
    context.state_mut().assign_register(receiver, item);
}

fn null_pointer() -> EmulationResult {
    EmulationResult::raised(VirtualException::without_message(NULL_POINTER))
}

fn object_get_class(_vm: &VirtualMachine, context: &mut ExecutionContext) -> Result<EmulationResult> {
    if argument(context, 0).is_null() {
        return Ok(null_pointer());
    }
    let runtime_type = context.runtime_type_of(context.state().parameter_start());
    let class = context.heap().alloc(Instance::Class(runtime_type))?;
    context
        .state_mut()
        .assign_return_register(HeapItem::reference(class, name::CLASS));
    Ok(EmulationResult::with_side_effect(SideEffect::None))
}

fn string_init_string(
    _vm: &VirtualMachine,
    context: &mut ExecutionContext,
) -> Result<EmulationResult> {
    let Some(text) = string_argument(context, 1)? else {
        return Ok(null_pointer());
    };
    let instance = context.heap().alloc_string(&text)?;
    replace_receiver(context, HeapItem::reference(instance, name::STRING));
    Ok(EmulationResult::with_side_effect(SideEffect::None))
}

fn builder_init(_vm: &VirtualMachine, context: &mut ExecutionContext) -> Result<EmulationResult> {
    let instance = context.heap().alloc(Instance::StringBuilder(String::new()))?;
    replace_receiver(context, HeapItem::reference(instance, name::STRING_BUILDER));
    Ok(EmulationResult::with_side_effect(SideEffect::None))
}

fn builder_init_string(
    _vm: &VirtualMachine,
    context: &mut ExecutionContext,
) -> Result<EmulationResult> {
    let Some(text) = string_argument(context, 1)? else {
        return Ok(null_pointer());
    };
    let instance = context
        .heap()
        .alloc(Instance::StringBuilder(text.to_string()))?;
    replace_receiver(context, HeapItem::reference(instance, name::STRING_BUILDER));
    Ok(EmulationResult::with_side_effect(SideEffect::None))
}

fn append(context: &mut ExecutionContext, suffix: &str) -> Result<EmulationResult> {
    let (handle, mut contents) = builder_receiver(context)?;
    contents.push_str(suffix);
    context
        .heap()
        .replace(handle, Instance::StringBuilder(contents))?;
    let receiver = argument(context, 0);
    context.state_mut().assign_return_register(receiver);
    Ok(EmulationResult::with_side_effect(SideEffect::Weak))
}

fn builder_append_string(
    _vm: &VirtualMachine,
    context: &mut ExecutionContext,
) -> Result<EmulationResult> {
    let suffix = string_argument(context, 1)?;
    append(context, suffix.as_deref().unwrap_or("null"))
}

fn builder_append_int(
    _vm: &VirtualMachine,
    context: &mut ExecutionContext,
) -> Result<EmulationResult> {
    let value = argument(context, 1);
    let Some(number) = value.value().as_i64() else {
        return Err(malformed_error!("append(I) with non-integer {}", value));
    };
    append(context, &number.to_string())
}

fn builder_to_string(
    _vm: &VirtualMachine,
    context: &mut ExecutionContext,
) -> Result<EmulationResult> {
    let (_, contents) = builder_receiver(context)?;
    let instance = context.heap().alloc_string(&contents)?;
    context
        .state_mut()
        .assign_return_register(HeapItem::reference(instance, name::STRING));
    Ok(EmulationResult::with_side_effect(SideEffect::None))
}

fn integer_parse_int(
    _vm: &VirtualMachine,
    context: &mut ExecutionContext,
) -> Result<EmulationResult> {
    let Some(text) = string_argument(context, 0)? else {
        return Ok(EmulationResult::raised(VirtualException::new(
            NUMBER_FORMAT,
            "Cannot parse null string",
        )));
    };
    match text.parse::<i32>() {
        Ok(number) => {
            context
                .state_mut()
                .assign_return_register(HeapItem::int(number));
            Ok(EmulationResult::with_side_effect(SideEffect::None))
        }
        Err(_) => Ok(EmulationResult::raised(VirtualException::new(
            NUMBER_FORMAT,
            format!("For input string: \"{text}\""),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{Heap, Register, Value},
        test::{callee_context, vm},
    };

    #[test]
    fn test_builder_roundtrip() {
        let vm = vm();
        let heap = Arc::new(Heap::default());
        let placeholder = heap.alloc_uninitialized(name::STRING_BUILDER).unwrap();

        let mut init = callee_context(&heap, "Ljava/lang/StringBuilder;-><init>()V", false);
        init.state_mut()
            .assign_parameter(0, HeapItem::reference(placeholder, name::STRING_BUILDER));
        let result = builder_init(&vm, &mut init).unwrap();
        assert_eq!(result.side_effect, SideEffect::None);
        let builder = init.state().peek_parameter(0);
        assert_ne!(builder.reference_handle(), Some(placeholder));

        let mut append_int = callee_context(
            &heap,
            "Ljava/lang/StringBuilder;->append(I)Ljava/lang/StringBuilder;",
            false,
        );
        append_int.state_mut().assign_parameter(0, builder.clone());
        append_int.state_mut().assign_parameter(1, HeapItem::int(42));
        let result = builder_append_int(&vm, &mut append_int).unwrap();
        assert_eq!(result.side_effect, SideEffect::Weak);
        assert_eq!(append_int.state().peek(Register::Return), builder);

        let mut append_null = callee_context(
            &heap,
            "Ljava/lang/StringBuilder;->append(Ljava/lang/String;)Ljava/lang/StringBuilder;",
            false,
        );
        append_null.state_mut().assign_parameter(0, builder.clone());
        append_null.state_mut().assign_parameter(1, HeapItem::null());
        builder_append_string(&vm, &mut append_null).unwrap();

        let mut to_string = callee_context(
            &heap,
            "Ljava/lang/StringBuilder;->toString()Ljava/lang/String;",
            false,
        );
        to_string.state_mut().assign_parameter(0, builder);
        builder_to_string(&vm, &mut to_string).unwrap();
        let returned = to_string.state().peek(Register::Return);
        let text = heap
            .get_string(returned.reference_handle().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(&*text, "42null");
    }

    #[test]
    fn test_append_to_non_builder_fails() {
        let vm = vm();
        let heap = Arc::new(Heap::default());
        let text = heap.alloc_string("x").unwrap();
        let mut context = callee_context(
            &heap,
            "Ljava/lang/StringBuilder;->append(I)Ljava/lang/StringBuilder;",
            false,
        );
        context
            .state_mut()
            .assign_parameter(0, HeapItem::reference(text, name::STRING_BUILDER));
        context.state_mut().assign_parameter(1, HeapItem::int(1));
        assert!(builder_append_int(&vm, &mut context).is_err());
    }

    #[test]
    fn test_parse_int() {
        let vm = vm();
        let heap = Arc::new(Heap::default());
        let mut context = callee_context(
            &heap,
            "Ljava/lang/Integer;->parseInt(Ljava/lang/String;)I",
            true,
        );
        let text = heap.alloc_string("-17").unwrap();
        context
            .state_mut()
            .assign_parameter(0, HeapItem::reference(text, name::STRING));
        let result = integer_parse_int(&vm, &mut context).unwrap();
        assert!(result.exceptions.is_empty());
        assert_eq!(context.state().peek(Register::Return).value(), Value::Int(-17));
    }

    #[test]
    fn test_parse_int_raises() {
        let vm = vm();
        let heap = Arc::new(Heap::default());
        let mut context = callee_context(
            &heap,
            "Ljava/lang/Integer;->parseInt(Ljava/lang/String;)I",
            true,
        );
        let text = heap.alloc_string("0x10").unwrap();
        context
            .state_mut()
            .assign_parameter(0, HeapItem::reference(text, name::STRING));
        let result = integer_parse_int(&vm, &mut context).unwrap();
        assert_eq!(result.exceptions.len(), 1);
        assert_eq!(
            result.exceptions[0].to_string(),
            "java.lang.NumberFormatException: For input string: \"0x10\""
        );
    }

    #[test]
    fn test_get_class_on_null() {
        let vm = vm();
        let heap = Arc::new(Heap::default());
        let mut context = callee_context(
            &heap,
            "Ljava/lang/Object;->getClass()Ljava/lang/Class;",
            false,
        );
        context.state_mut().assign_parameter(0, HeapItem::null());
        let result = object_get_class(&vm, &mut context).unwrap();
        assert_eq!(
            &**result.exceptions[0].exception_class(),
            "Ljava/lang/NullPointerException;"
        );
    }

    #[test]
    fn test_get_class_returns_runtime_type() {
        let vm = vm();
        let heap = Arc::new(Heap::default());
        let mut context = callee_context(
            &heap,
            "Ljava/lang/Object;->getClass()Ljava/lang/Class;",
            false,
        );
        let s = heap.alloc_string("x").unwrap();
        context
            .state_mut()
            .assign_parameter(0, HeapItem::reference(s, name::OBJECT));
        object_get_class(&vm, &mut context).unwrap();
        let class = context.state().peek(Register::Return);
        assert_eq!(
            heap.get(class.reference_handle().unwrap()).unwrap(),
            Instance::Class(name::STRING.into())
        );
    }

    #[test]
    fn test_string_init_requires_argument() {
        let vm = vm();
        let heap = Arc::new(Heap::default());
        let mut context = callee_context(
            &heap,
            "Ljava/lang/String;-><init>(Ljava/lang/String;)V",
            false,
        );
        context.state_mut().assign_parameter(1, HeapItem::null());
        let result = string_init_string(&vm, &mut context).unwrap();
        assert_eq!(result.exceptions.len(), 1);
    }
}
