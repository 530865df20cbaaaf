//! Classes for `data` declarations
//!
//! `data Foo = Bar | Baz(Int)` becomes an abstract class `Foo` plus one
//! final subclass per value constructor, nested as `Foo$Bar` and `Foo$Baz`.
//! Nullary constructors share one instance held in a static `INSTANCE`.

use log::debug;

use crate::backend::jvm::classfile::{ClassFile, FieldInfo, FieldRef, InnerClassEntry, MethodInfo, MethodRef};
use crate::backend::jvm::context::CompilationContext;
use crate::backend::jvm::descriptor::{internal_name, outer_class, JvmType, MethodSig, OBJECT_CLASS};
use crate::backend::jvm::method::MethodBuilder;
use crate::backend::jvm::node_gen::SINGLETON_FIELD;
use crate::backend::jvm::opcodes::access::*;
use crate::common::phase::CodegenPrereq;
use crate::frontend::ast::{DataDeclarationNode, ValueConstructorDeclarationNode};
use crate::middle::attrs::ResolvedAttrs;
use crate::utils::{Error, Result};

const NESTED_ACCESS: u16 = ACC_PUBLIC | ACC_STATIC | ACC_FINAL;

fn inner_entry(inner: &str, outer: &str) -> InnerClassEntry {
    InnerClassEntry {
        inner: inner.to_string(),
        outer: outer.to_string(),
        simple_name: inner.rsplit('$').next().unwrap_or(inner).to_string(),
        access: NESTED_ACCESS,
    }
}

/// `aload_0; invokespecial <super>.<init>()V; return`
fn chaining_constructor(access: u16, super_name: &str) -> Result<MethodInfo> {
    let mut mb = MethodBuilder::new(access, "<init>", MethodSig::void());
    mb.load_this();
    mb.invoke_special(MethodRef::new(super_name, "<init>", MethodSig::void()));
    mb.return_value();
    mb.finish()
}

/// Emit the classes for one data declaration into `ctx.units`
pub fn generate_data_declaration(
    ctx: &mut CompilationContext<'_>,
    data: &DataDeclarationNode<CodegenPrereq>,
) -> Result<()> {
    let type_fqn = data.declaration_fqn()?.clone();
    ctx.scoped(|c| &mut c.current_data, Some(type_fqn.clone()), |ctx| {
        let base = match ctx.type_handle(&type_fqn)? {
            JvmType::Reference(name) => name,
            other => return Err(Error::UnsupportedType { ty: other.to_string() }),
        };
        debug!("type constructor {} -> {}", type_fqn, base);

        let mut class = ClassFile::new(ACC_PUBLIC | ACC_SUPER | ACC_ABSTRACT, base.as_str(), OBJECT_CLASS);
        class.methods.push(chaining_constructor(ACC_PROTECTED, OBJECT_CLASS)?);

        let mut nested = Vec::new();
        for ctor in &data.value_constructors {
            let unit = generate_value_constructor(ctx, &base, ctor)?;
            if outer_class(&unit.name) == Some(base.as_str()) {
                class.inner_classes.push(inner_entry(&unit.name, &base));
            }
            nested.push(unit);
        }

        ctx.units.push(class);
        ctx.units.extend(nested);
        Ok(())
    })
}

fn generate_value_constructor(
    ctx: &mut CompilationContext<'_>,
    base: &str,
    ctor: &ValueConstructorDeclarationNode<CodegenPrereq>,
) -> Result<ClassFile> {
    let fqn = ctor.declaration_fqn()?;
    let name = internal_name(fqn);
    let arity = ctx.arity_of(fqn)?;
    debug!("value constructor {} -> {} (arity {})", fqn, name, arity);

    let mut class = ClassFile::new(ACC_PUBLIC | ACC_FINAL | ACC_SUPER, name.as_str(), base);
    if let Some(outer) = outer_class(&name) {
        class.inner_classes.push(inner_entry(&name, outer));
    }

    class.methods.push(chaining_constructor(ACC_PUBLIC, base)?);

    if arity == 0 {
        let self_type = JvmType::reference(name.as_str());
        let instance = FieldRef::new(name.as_str(), SINGLETON_FIELD, self_type.clone());
        class.fields.push(FieldInfo {
            access: ACC_PUBLIC | ACC_STATIC | ACC_FINAL,
            name: SINGLETON_FIELD.to_string(),
            ty: self_type,
        });

        let mut clinit = MethodBuilder::new(ACC_STATIC, "<clinit>", MethodSig::void());
        clinit.new_instance(name.as_str());
        clinit.dup();
        clinit.invoke_special(MethodRef::new(name.as_str(), "<init>", MethodSig::void()));
        clinit.put_static(instance);
        clinit.return_value();
        class.methods.push(clinit.finish()?);
    }

    let mut to_string = MethodBuilder::new(ACC_PUBLIC, "toString", MethodSig::new(vec![], JvmType::string()));
    to_string.push_string(fqn.final_segment());
    to_string.return_value();
    class.methods.push(to_string.finish()?);

    Ok(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::jvm::method::Instruction;
    use crate::common::FullyQualifiedName;
    use crate::frontend::dsl::*;
    use crate::frontend::ast::Node;
    use crate::middle::attrs::MiddleAttrsMut;
    use crate::types::{SomelangType, TypeContext};
    use pretty_assertions::assert_eq;

    fn foo_declaration() -> DataDeclarationNode<CodegenPrereq> {
        let Node::DataDeclaration(mut data) = data("Foo", vec![("Bar", vec![]), ("Baz", vec![type_name("Int")])]) else {
            panic!("expected data declaration")
        };
        data.set_declaration_fqn(FullyQualifiedName::new("somelang.Foo"));
        data.value_constructors[0].set_declaration_fqn(FullyQualifiedName::new("somelang.Foo.Bar"));
        data.value_constructors[1].set_declaration_fqn(FullyQualifiedName::new("somelang.Foo.Baz"));
        data
    }

    fn generate() -> Vec<ClassFile> {
        let mut types = TypeContext::new();
        types.insert(FullyQualifiedName::new("somelang.Foo"), SomelangType::object("somelang.Foo"));
        let mut ctx = CompilationContext::new(&types);
        ctx.constructor_arity.insert(FullyQualifiedName::new("somelang.Foo.Bar"), 0);
        ctx.constructor_arity.insert(FullyQualifiedName::new("somelang.Foo.Baz"), 1);
        generate_data_declaration(&mut ctx, &foo_declaration()).unwrap();
        assert_eq!(ctx.current_data, None);
        ctx.units
    }

    #[test]
    fn test_class_layout() {
        let units = generate();
        let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["somelang/Foo", "somelang/Foo$Bar", "somelang/Foo$Baz"]);

        let base = &units[0];
        assert_ne!(base.access & ACC_ABSTRACT, 0);
        assert_eq!(base.method("<init>").unwrap().access, ACC_PROTECTED);
        assert_eq!(base.inner_classes.len(), 2);
        assert_eq!(base.inner_classes[0].simple_name, "Bar");

        let bar = &units[1];
        assert_eq!(bar.super_name, "somelang/Foo");
        assert_eq!(bar.inner_classes, vec![inner_entry("somelang/Foo$Bar", "somelang/Foo")]);
        assert_eq!(
            bar.method("<init>").unwrap().code.instructions,
            vec![
                Instruction::ALoad(0),
                Instruction::InvokeSpecial(MethodRef::new("somelang/Foo", "<init>", MethodSig::void())),
                Instruction::Return,
            ]
        );
    }

    #[test]
    fn test_nullary_constructor_is_a_singleton() {
        let units = generate();
        let bar = &units[1];
        let instance = bar.field(SINGLETON_FIELD).unwrap();
        assert_eq!(instance.access, ACC_PUBLIC | ACC_STATIC | ACC_FINAL);
        assert_eq!(instance.ty, JvmType::reference("somelang/Foo$Bar"));

        let clinit = bar.method("<clinit>").unwrap();
        assert_eq!(clinit.code.max_stack, 2);
        assert!(matches!(clinit.code.instructions[0], Instruction::New(ref c) if c == "somelang/Foo$Bar"));
        assert!(matches!(clinit.code.instructions[3], Instruction::PutStatic(ref f) if f.name == "INSTANCE"));

        let baz = &units[2];
        assert!(baz.field(SINGLETON_FIELD).is_none());
        assert!(baz.method("<clinit>").is_none());
    }

    #[test]
    fn test_to_string_returns_simple_name() {
        let units = generate();
        let to_string = units[2].method("toString").unwrap();
        assert_eq!(
            to_string.code.instructions,
            vec![Instruction::PushString("Baz".to_string()), Instruction::AReturn]
        );
        assert_eq!(to_string.sig.descriptor(), "()Ljava/lang/String;");
    }
}
