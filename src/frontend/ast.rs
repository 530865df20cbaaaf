//! Abstract Syntax Tree for somelang
//!
//! Every node is parameterized by the phase it has reached (see
//! [`crate::common::phase`]). The structure of a tree never changes after
//! parsing; passes only add attributes and then re-tag the tree with the
//! next phase.

use std::fmt;
use std::marker::PhantomData;

use crate::common::{Attributable, Attributes, Name, Phase};

// ==================== Node metadata ====================

/// Attribute store plus the phase tag shared by every node
pub struct Meta<P> {
    attributes: Attributes,
    phase: PhantomData<fn() -> P>,
}

impl<P> Meta<P> {
    pub fn new() -> Self {
        Self {
            attributes: Attributes::new(),
            phase: PhantomData,
        }
    }

    fn rephase<Q>(self) -> Meta<Q> {
        Meta {
            attributes: self.attributes,
            phase: PhantomData,
        }
    }
}

impl<P> Default for Meta<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for Meta<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.attributes.fmt(f)
    }
}

/// A tree node at a known phase
pub trait AstNode: Attributable + fmt::Debug {
    type Phase: Phase;
}

// ==================== Declarations ====================

/// One source file: the root of every tree
#[derive(Debug)]
pub struct FileNode<P> {
    pub nodes: Vec<Node<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct FunctionDeclarationNode<P> {
    pub name: IdentifierNode<P>,
    pub parameters: Vec<ParameterDeclarationNode<P>>,
    pub return_type: Option<TypeExpressionNode<P>>,
    pub body: Box<Node<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct ParameterDeclarationNode<P> {
    pub name: IdentifierNode<P>,
    pub ty: Option<TypeExpressionNode<P>>,
    pub meta: Meta<P>,
}

/// `data Foo = Bar | Baz(Int)`
#[derive(Debug)]
pub struct DataDeclarationNode<P> {
    pub type_constructor: TypeConstructorDeclarationNode<P>,
    pub value_constructors: Vec<ValueConstructorDeclarationNode<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct TypeConstructorDeclarationNode<P> {
    pub name: IdentifierNode<P>,
    pub type_parameters: Vec<IdentifierNode<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct ValueConstructorDeclarationNode<P> {
    pub name: IdentifierNode<P>,
    pub parameters: Vec<TypeExpressionNode<P>>,
    pub meta: Meta<P>,
}

// ==================== Statements ====================

#[derive(Debug)]
pub struct BlockNode<P> {
    pub statements: Vec<Node<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct ReturnNode<P> {
    pub value: Box<Node<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct LocalVarDeclarationNode<P> {
    pub name: IdentifierNode<P>,
    pub ty: Option<TypeExpressionNode<P>>,
    pub rhs: Box<Node<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct NoOpNode<P> {
    pub meta: Meta<P>,
}

// ==================== Expressions ====================

#[derive(Debug)]
pub struct IdentifierNode<P> {
    pub name: Name,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct ReadLocalVarNode<P> {
    pub target: IdentifierNode<P>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct IntLiteralNode<P> {
    pub value: i32,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct StringLiteralNode<P> {
    pub value: String,
    pub meta: Meta<P>,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
        }
    }
}

#[derive(Debug)]
pub struct BinaryOperationNode<P> {
    pub operator: BinaryOperator,
    pub lhs: Box<Node<P>>,
    pub rhs: Box<Node<P>>,
    pub meta: Meta<P>,
}

/// Call of a free function
#[derive(Debug)]
pub struct InvokeNode<P> {
    pub target: IdentifierNode<P>,
    pub arguments: Vec<ArgumentNode<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub enum ArgumentNode<P> {
    Positional(PositionalArgumentNode<P>),
}

impl<P> ArgumentNode<P> {
    pub fn value(&self) -> &Node<P> {
        match self {
            Self::Positional(arg) => &arg.value,
        }
    }
}

#[derive(Debug)]
pub struct PositionalArgumentNode<P> {
    pub value: Box<Node<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct GetStaticValueNode<P> {
    pub target: IdentifierNode<P>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct ReadFieldValueNode<P> {
    pub receiver: Box<Node<P>>,
    pub field: IdentifierNode<P>,
    pub meta: Meta<P>,
}

/// Use of a value constructor, e.g. `Bar`
#[derive(Debug)]
pub struct ValueConstructorInvocationNode<P> {
    pub target: IdentifierNode<P>,
    pub meta: Meta<P>,
}

// ==================== Type expressions ====================

#[derive(Debug)]
pub enum TypeExpressionNode<P> {
    Name(TypeNameNode<P>),
    ConstructorInvocation(TypeConstructorInvocationNode<P>),
    Function(FunctionTypeNode<P>),
}

#[derive(Debug)]
pub struct TypeNameNode<P> {
    pub name: IdentifierNode<P>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct TypeConstructorInvocationNode<P> {
    pub target: IdentifierNode<P>,
    pub arguments: Vec<TypeExpressionNode<P>>,
    pub meta: Meta<P>,
}

#[derive(Debug)]
pub struct FunctionTypeNode<P> {
    pub argument_types: Vec<TypeExpressionNode<P>>,
    pub return_type: Box<TypeExpressionNode<P>>,
    pub meta: Meta<P>,
}

// ==================== The node sum ====================

/// Any statement, expression, or declaration
#[derive(Debug)]
pub enum Node<P> {
    File(FileNode<P>),
    FunctionDeclaration(FunctionDeclarationNode<P>),
    DataDeclaration(DataDeclarationNode<P>),
    Block(BlockNode<P>),
    Return(ReturnNode<P>),
    LocalVarDeclaration(LocalVarDeclarationNode<P>),
    ReadLocalVar(ReadLocalVarNode<P>),
    Identifier(IdentifierNode<P>),
    IntLiteral(IntLiteralNode<P>),
    StringLiteral(StringLiteralNode<P>),
    BinaryOperation(BinaryOperationNode<P>),
    Invoke(InvokeNode<P>),
    GetStaticValue(GetStaticValueNode<P>),
    ReadFieldValue(ReadFieldValueNode<P>),
    ValueConstructorInvocation(ValueConstructorInvocationNode<P>),
    NoOp(NoOpNode<P>),
}

macro_rules! ast_nodes {
    ($($node:ident => $kind:literal $(, |$n:ident| $detail:expr)?;)*) => {$(
        impl<P: Phase> Attributable for $node<P> {
            fn attributes(&self) -> &Attributes {
                &self.meta.attributes
            }

            fn attributes_mut(&mut self) -> &mut Attributes {
                &mut self.meta.attributes
            }

            fn describe(&self) -> String {
                #[allow(unused_variables)]
                let this = self;
                let detail: Option<String> = None $(.or_else(|| {
                    let $n = this;
                    Some($detail)
                }))?;
                match detail {
                    Some(detail) => format!("{} `{}`", $kind, detail),
                    None => $kind.to_string(),
                }
            }
        }

        impl<P: Phase> AstNode for $node<P> {
            type Phase = P;
        }
    )*};
}

ast_nodes! {
    FileNode => "file";
    FunctionDeclarationNode => "function declaration", |n| n.name.name.to_string();
    ParameterDeclarationNode => "parameter", |n| n.name.name.to_string();
    DataDeclarationNode => "data declaration", |n| n.type_constructor.name.name.to_string();
    TypeConstructorDeclarationNode => "type constructor", |n| n.name.name.to_string();
    ValueConstructorDeclarationNode => "value constructor", |n| n.name.name.to_string();
    BlockNode => "block";
    ReturnNode => "return";
    LocalVarDeclarationNode => "local variable declaration", |n| n.name.name.to_string();
    NoOpNode => "no-op";
    IdentifierNode => "identifier", |n| n.name.to_string();
    ReadLocalVarNode => "local variable read", |n| n.target.name.to_string();
    IntLiteralNode => "integer literal", |n| n.value.to_string();
    StringLiteralNode => "string literal", |n| format!("{:?}", n.value);
    BinaryOperationNode => "binary operation", |n| n.operator.symbol().to_string();
    InvokeNode => "invocation", |n| n.target.name.to_string();
    PositionalArgumentNode => "positional argument";
    GetStaticValueNode => "static value read", |n| n.target.name.to_string();
    ReadFieldValueNode => "field read", |n| n.field.name.to_string();
    ValueConstructorInvocationNode => "value constructor invocation", |n| n.target.name.to_string();
    TypeNameNode => "type name", |n| n.name.name.to_string();
    TypeConstructorInvocationNode => "type constructor invocation", |n| n.target.name.to_string();
    FunctionTypeNode => "function type";
}

macro_rules! delegate_node {
    ($enum:ident { $($variant:ident),* $(,)? }) => {
        impl<P: Phase> Attributable for $enum<P> {
            fn attributes(&self) -> &Attributes {
                match self { $(Self::$variant(n) => n.attributes(),)* }
            }

            fn attributes_mut(&mut self) -> &mut Attributes {
                match self { $(Self::$variant(n) => n.attributes_mut(),)* }
            }

            fn describe(&self) -> String {
                match self { $(Self::$variant(n) => n.describe(),)* }
            }
        }

        impl<P: Phase> AstNode for $enum<P> {
            type Phase = P;
        }
    };
}

delegate_node!(Node {
    File,
    FunctionDeclaration,
    DataDeclaration,
    Block,
    Return,
    LocalVarDeclaration,
    ReadLocalVar,
    Identifier,
    IntLiteral,
    StringLiteral,
    BinaryOperation,
    Invoke,
    GetStaticValue,
    ReadFieldValue,
    ValueConstructorInvocation,
    NoOp,
});

delegate_node!(ArgumentNode { Positional });

delegate_node!(TypeExpressionNode {
    Name,
    ConstructorInvocation,
    Function,
});

macro_rules! node_from {
    ($($variant:ident($node:ident)),* $(,)?) => {$(
        impl<P> From<$node<P>> for Node<P> {
            fn from(node: $node<P>) -> Self {
                Node::$variant(node)
            }
        }
    )*};
}

node_from!(
    File(FileNode),
    FunctionDeclaration(FunctionDeclarationNode),
    DataDeclaration(DataDeclarationNode),
    Block(BlockNode),
    Return(ReturnNode),
    LocalVarDeclaration(LocalVarDeclarationNode),
    ReadLocalVar(ReadLocalVarNode),
    Identifier(IdentifierNode),
    IntLiteral(IntLiteralNode),
    StringLiteral(StringLiteralNode),
    BinaryOperation(BinaryOperationNode),
    Invoke(InvokeNode),
    GetStaticValue(GetStaticValueNode),
    ReadFieldValue(ReadFieldValueNode),
    ValueConstructorInvocation(ValueConstructorInvocationNode),
    NoOp(NoOpNode),
);

impl<P: Phase> FileNode<P> {
    /// Function declarations in source order
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDeclarationNode<P>> {
        self.nodes.iter().filter_map(|node| match node {
            Node::FunctionDeclaration(decl) => Some(decl),
            _ => None,
        })
    }

    /// Data declarations in source order
    pub fn data_declarations(&self) -> impl Iterator<Item = &DataDeclarationNode<P>> {
        self.nodes.iter().filter_map(|node| match node {
            Node::DataDeclaration(decl) => Some(decl),
            _ => None,
        })
    }
}

impl<P: Phase> FunctionDeclarationNode<P> {
    /// Source name of the function
    pub fn simple_name(&self) -> &str {
        self.name.name.text()
    }
}

// ==================== Phase transitions ====================

/// Re-tag a tree with another phase, keeping every attribute
///
/// Only the passes call this; they are what make the new tag truthful.
pub(crate) trait Rephase {
    type At<Q: Phase>;

    fn rephase<Q: Phase>(self) -> Self::At<Q>;
}

impl<T: Rephase> Rephase for Vec<T> {
    type At<Q: Phase> = Vec<T::At<Q>>;

    fn rephase<Q: Phase>(self) -> Self::At<Q> {
        self.into_iter().map(|item| item.rephase::<Q>()).collect()
    }
}

impl<T: Rephase> Rephase for Box<T> {
    type At<Q: Phase> = Box<T::At<Q>>;

    fn rephase<Q: Phase>(self) -> Self::At<Q> {
        Box::new((*self).rephase::<Q>())
    }
}

impl<T: Rephase> Rephase for Option<T> {
    type At<Q: Phase> = Option<T::At<Q>>;

    fn rephase<Q: Phase>(self) -> Self::At<Q> {
        self.map(|item| item.rephase::<Q>())
    }
}

macro_rules! rephase_struct {
    ($($node:ident { $($field:ident),* }),* $(,)?) => {$(
        impl<P: Phase> Rephase for $node<P> {
            type At<Q: Phase> = $node<Q>;

            fn rephase<Q: Phase>(self) -> $node<Q> {
                $node {
                    $($field: self.$field.rephase::<Q>(),)*
                    meta: self.meta.rephase::<Q>(),
                }
            }
        }
    )*};
}

rephase_struct! {
    FileNode { nodes },
    FunctionDeclarationNode { name, parameters, return_type, body },
    ParameterDeclarationNode { name, ty },
    DataDeclarationNode { type_constructor, value_constructors },
    TypeConstructorDeclarationNode { name, type_parameters },
    ValueConstructorDeclarationNode { name, parameters },
    BlockNode { statements },
    ReturnNode { value },
    LocalVarDeclarationNode { name, ty, rhs },
    NoOpNode {},
    ReadLocalVarNode { target },
    PositionalArgumentNode { value },
    InvokeNode { target, arguments },
    GetStaticValueNode { target },
    ReadFieldValueNode { receiver, field },
    ValueConstructorInvocationNode { target },
    TypeNameNode { name },
    TypeConstructorInvocationNode { target, arguments },
    FunctionTypeNode { argument_types, return_type },
}

impl<P: Phase> Rephase for IdentifierNode<P> {
    type At<Q: Phase> = IdentifierNode<Q>;

    fn rephase<Q: Phase>(self) -> IdentifierNode<Q> {
        IdentifierNode { name: self.name, meta: self.meta.rephase() }
    }
}

impl<P: Phase> Rephase for IntLiteralNode<P> {
    type At<Q: Phase> = IntLiteralNode<Q>;

    fn rephase<Q: Phase>(self) -> IntLiteralNode<Q> {
        IntLiteralNode { value: self.value, meta: self.meta.rephase() }
    }
}

impl<P: Phase> Rephase for StringLiteralNode<P> {
    type At<Q: Phase> = StringLiteralNode<Q>;

    fn rephase<Q: Phase>(self) -> StringLiteralNode<Q> {
        StringLiteralNode { value: self.value, meta: self.meta.rephase() }
    }
}

impl<P: Phase> Rephase for BinaryOperationNode<P> {
    type At<Q: Phase> = BinaryOperationNode<Q>;

    fn rephase<Q: Phase>(self) -> BinaryOperationNode<Q> {
        BinaryOperationNode {
            operator: self.operator,
            lhs: self.lhs.rephase::<Q>(),
            rhs: self.rhs.rephase::<Q>(),
            meta: self.meta.rephase(),
        }
    }
}

macro_rules! rephase_enum {
    ($($enum:ident { $($variant:ident),* $(,)? }),* $(,)?) => {$(
        impl<P: Phase> Rephase for $enum<P> {
            type At<Q: Phase> = $enum<Q>;

            fn rephase<Q: Phase>(self) -> $enum<Q> {
                match self {
                    $($enum::$variant(n) => $enum::$variant(n.rephase::<Q>()),)*
                }
            }
        }
    )*};
}

rephase_enum! {
    Node {
        File,
        FunctionDeclaration,
        DataDeclaration,
        Block,
        Return,
        LocalVarDeclaration,
        ReadLocalVar,
        Identifier,
        IntLiteral,
        StringLiteral,
        BinaryOperation,
        Invoke,
        GetStaticValue,
        ReadFieldValue,
        ValueConstructorInvocation,
        NoOp,
    },
    ArgumentNode { Positional },
    TypeExpressionNode { Name, ConstructorInvocation, Function },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::phase::{Parsing, Typechecking};
    use crate::common::AttrDef;
    use crate::frontend::dsl::*;

    static MARK: AttrDef<u8> = AttrDef::new("mark");

    #[test]
    fn test_describe_names_the_node() {
        let node: Node<Parsing> = invoke("echo", vec![string("abc")]);
        assert_eq!(node.describe(), "invocation `echo`");
        let block: Node<Parsing> = block(vec![]);
        assert_eq!(block.describe(), "block");
    }

    #[test]
    fn test_rephase_keeps_structure_and_attributes() {
        let mut inner: Node<Parsing> = int(7);
        inner.put_attribute(&MARK, 1);
        let file: FileNode<Parsing> = file(vec![fun("f", vec![], None, block(vec![ret(inner)]))]);

        let file: FileNode<Typechecking> = file.rephase();
        let decl = file.functions().next().unwrap();
        assert_eq!(decl.simple_name(), "f");
        let Node::Block(body) = decl.body.as_ref() else { panic!("expected block") };
        let Node::Return(ret) = &body.statements[0] else { panic!("expected return") };
        assert_eq!(ret.value.get_attribute(&MARK), Some(&1));
    }

    #[test]
    fn test_file_accessors() {
        let file: FileNode<Parsing> = file(vec![
            data("Foo", vec![("Bar", vec![])]),
            fun("f", vec![], None, block(vec![])),
        ]);
        assert_eq!(file.functions().count(), 1);
        assert_eq!(file.data_declarations().count(), 1);
    }
}
