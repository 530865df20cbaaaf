//! Terse constructors for building trees by hand
//!
//! The parser builds through these too, so trees made in tests have
//! exactly the shape parsed source has.

use crate::common::{Name, Phase};
use crate::frontend::ast::*;

pub fn file<P: Phase>(nodes: Vec<Node<P>>) -> FileNode<P> {
    FileNode { nodes, meta: Meta::new() }
}

pub fn id<P: Phase>(name: &str) -> IdentifierNode<P> {
    IdentifierNode {
        name: Name::unresolved(name),
        meta: Meta::new(),
    }
}

pub fn param<P: Phase>(name: &str, ty: Option<TypeExpressionNode<P>>) -> ParameterDeclarationNode<P> {
    ParameterDeclarationNode {
        name: id(name),
        ty,
        meta: Meta::new(),
    }
}

pub fn fun<P: Phase>(
    name: &str,
    parameters: Vec<ParameterDeclarationNode<P>>,
    return_type: Option<TypeExpressionNode<P>>,
    body: Node<P>,
) -> Node<P> {
    Node::FunctionDeclaration(FunctionDeclarationNode {
        name: id(name),
        parameters,
        return_type,
        body: Box::new(body),
        meta: Meta::new(),
    })
}

/// `data <type_name> = <ctor>(<params>) | ...`
pub fn data<P: Phase>(type_name: &str, constructors: Vec<(&str, Vec<TypeExpressionNode<P>>)>) -> Node<P> {
    Node::DataDeclaration(DataDeclarationNode {
        type_constructor: TypeConstructorDeclarationNode {
            name: id(type_name),
            type_parameters: Vec::new(),
            meta: Meta::new(),
        },
        value_constructors: constructors
            .into_iter()
            .map(|(name, parameters)| value_constructor(name, parameters))
            .collect(),
        meta: Meta::new(),
    })
}

pub fn value_constructor<P: Phase>(
    name: &str,
    parameters: Vec<TypeExpressionNode<P>>,
) -> ValueConstructorDeclarationNode<P> {
    ValueConstructorDeclarationNode {
        name: id(name),
        parameters,
        meta: Meta::new(),
    }
}

pub fn block<P: Phase>(statements: Vec<Node<P>>) -> Node<P> {
    Node::Block(BlockNode { statements, meta: Meta::new() })
}

pub fn ret<P: Phase>(value: Node<P>) -> Node<P> {
    Node::Return(ReturnNode {
        value: Box::new(value),
        meta: Meta::new(),
    })
}

pub fn let_<P: Phase>(name: &str, ty: Option<TypeExpressionNode<P>>, rhs: Node<P>) -> Node<P> {
    Node::LocalVarDeclaration(LocalVarDeclarationNode {
        name: id(name),
        ty,
        rhs: Box::new(rhs),
        meta: Meta::new(),
    })
}

pub fn read<P: Phase>(name: &str) -> Node<P> {
    Node::ReadLocalVar(ReadLocalVarNode {
        target: id(name),
        meta: Meta::new(),
    })
}

pub fn int<P: Phase>(value: i32) -> Node<P> {
    Node::IntLiteral(IntLiteralNode { value, meta: Meta::new() })
}

pub fn string<P: Phase>(value: &str) -> Node<P> {
    Node::StringLiteral(StringLiteralNode {
        value: value.to_string(),
        meta: Meta::new(),
    })
}

pub fn add<P: Phase>(lhs: Node<P>, rhs: Node<P>) -> Node<P> {
    Node::BinaryOperation(BinaryOperationNode {
        operator: BinaryOperator::Add,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        meta: Meta::new(),
    })
}

pub fn invoke<P: Phase>(target: &str, arguments: Vec<Node<P>>) -> Node<P> {
    Node::Invoke(InvokeNode {
        target: id(target),
        arguments: arguments
            .into_iter()
            .map(|value| {
                ArgumentNode::Positional(PositionalArgumentNode {
                    value: Box::new(value),
                    meta: Meta::new(),
                })
            })
            .collect(),
        meta: Meta::new(),
    })
}

pub fn construct<P: Phase>(target: &str) -> Node<P> {
    Node::ValueConstructorInvocation(ValueConstructorInvocationNode {
        target: id(target),
        meta: Meta::new(),
    })
}

pub fn noop<P: Phase>() -> Node<P> {
    Node::NoOp(NoOpNode { meta: Meta::new() })
}

pub fn type_name<P: Phase>(name: &str) -> TypeExpressionNode<P> {
    TypeExpressionNode::Name(TypeNameNode {
        name: id(name),
        meta: Meta::new(),
    })
}

pub fn function_type<P: Phase>(
    argument_types: Vec<TypeExpressionNode<P>>,
    return_type: TypeExpressionNode<P>,
) -> TypeExpressionNode<P> {
    TypeExpressionNode::Function(FunctionTypeNode {
        argument_types,
        return_type: Box::new(return_type),
        meta: Meta::new(),
    })
}
