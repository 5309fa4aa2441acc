use super::*;
use pretty_assertions::assert_eq;

#[test]
fn all_lists_every_opcode_once_in_index_order() {
    assert_eq!(Opcode::ALL.len(), Opcode::COUNT);
    for (i, op) in Opcode::ALL.iter().enumerate() {
        assert_eq!(op.index(), i, "{op:?} out of place");
    }
}

#[test]
fn compound_assignments_map_to_their_binary_operator() {
    for op in Opcode::ALL {
        let Some(base) = op.compound_base() else {
            continue;
        };
        let spelled = op.symbol().trim_end_matches('=');
        assert_eq!(Opcode::binary(spelled), Some(base));
        assert_eq!(Opcode::assignment(op.symbol()), Some(op));
    }
    assert_eq!(Opcode::Assign.compound_base(), None);
}

#[test]
fn binary_lookup_round_trips_through_symbol() {
    for symbol in ["+", "**", ">>>", "!==", "instanceof", "in", "<="] {
        let op = Opcode::binary(symbol);
        assert_eq!(op.map(Opcode::symbol), Some(symbol));
    }
    assert_eq!(Opcode::binary("=>"), None);
}

#[test]
fn node_opcode_reflects_optional_chaining() {
    let member = Node::Member {
        object: Box::new(Node::ident("a")),
        property: Box::new(Node::Str("b".into())),
        optional: true,
    };
    assert_eq!(member.opcode(), Some(Opcode::PropOptional));
    assert!(!member.is_assignable());

    let call = Node::Call {
        callee: Box::new(Node::ident("f")),
        args: vec![],
        optional: false,
    };
    assert_eq!(call.opcode(), Some(Opcode::Call));
    assert_eq!(Node::Empty.opcode(), None);
}

#[test]
fn logical_and_declaration_keywords() {
    assert_eq!(LogicalOp::from_symbol("??="), Some(LogicalOp::Nullish));
    assert_eq!(LogicalOp::from_symbol("|"), None);
    assert_eq!(DeclKind::from_keyword("const"), Some(DeclKind::Const));
    assert_eq!(DeclKind::from_keyword("function"), None);
}
