use ogdl::{Graph, Path, Scalar, is_integer, is_number};

/// `a` with children `b -> 1`, `c -> 2`, `b -> 3`.
fn abcb() -> Graph {
    let mut g = Graph::new("a");
    g.add("b").add(1);
    g.add("c").add(2);
    g.add("b").add(3);
    g
}

#[test]
fn group_selector_collects_siblings() {
    let g = abcb();
    assert_eq!(g.get("a.b{0}").scalar(), Scalar::Int(1));
    assert_eq!(g.get("a.b{1}").scalar(), Scalar::Int(3));

    let group = g.get("a.b{}");
    let values: Vec<&Scalar> = group.iter().map(Graph::this).collect();
    assert_eq!(values, vec![&Scalar::Int(1), &Scalar::Int(3)]);
}

#[test]
fn navigation_never_fails() {
    let g = abcb();
    assert!(g.get("a.x").is_empty());
    assert!(g.get("a.b{9}").is_empty());
    assert!(g.get("zz.yy.xx").is_empty());
    assert!(g.child("nope").child("deeper").is_nil());
    assert!(g.at(42).at(0).is_nil());
    assert!(g.get("a(").is_empty());
}

#[test]
fn set_replaces_target_subtree() {
    let mut g = Graph::new("a");
    g.add("b").add("c");
    g.set("b", "d");
    assert_eq!(g.text(), "a\n  b\n    d");
    assert_eq!(g.len(), 1);
}

#[test]
fn set_creates_path_and_chains() {
    let mut g = Graph::nil();
    g.set("a.b.c", 1).set_this("c");
    g.set("a.b.d", 2);
    assert_eq!(g.get_int("a.b.c"), Some(1));
    assert_eq!(g.get_int("a.b.d"), Some(2));
    assert_eq!(g.child("a").len(), 1);
}

#[test]
fn delete_out_of_range_is_noop() {
    let mut g = abcb();
    assert!(g.delete_at(3).is_none());
    assert_eq!(g.len(), 3);
    assert_eq!(g.delete_at(1).map(|n| n.at(0).scalar()), Some(Scalar::Int(2)));
    assert_eq!(g.len(), 2);
}

#[test]
fn nil_sentinel_properties() {
    let nil = Graph::nil();
    assert!(nil.is_nil());
    assert_eq!(nil.len(), 0);
    assert_eq!(nil.depth(), 0);
    assert_eq!(nil.text(), "");
    assert_eq!(Graph::nil_ref(), &nil);

    let mut g = Graph::nil();
    g.add("x");
    assert!(g.is_nil());
    assert_eq!(g.len(), 1);
}

#[test]
fn text_indents_each_level() {
    let mut g = Graph::nil();
    let server = g.add("server");
    server.add("host").add("example.org");
    server.add("motd").add("hello there");
    assert_eq!(
        g.text(),
        "server\n  host\n    example.org\n  motd\n    \"hello there\""
    );
}

#[test]
fn scalar_coercion() {
    let mut g = Graph::nil();
    g.add("i").add(" 12 ");
    g.add("f").add("1.5");
    g.add("s").add("1 2");
    assert_eq!(g.get("i").scalar(), Scalar::Int(12));
    assert_eq!(g.get("f").number(), Some(Scalar::Float(1.5)));
    assert_eq!(g.get("s").number(), None);
    assert_eq!(g.get("s").scalar(), Scalar::from("1 2"));

    assert!(is_integer(" -1 "));
    assert!(!is_integer(" - 1"));
    assert!(is_number("9.1"));
    assert!(!is_number("9.1x"));
}

#[test]
fn path_compilation() {
    assert_eq!(Path::parse("").unwrap().len(), 0);
    assert_eq!(Path::parse("a.b{}.c(1, d)").unwrap().len(), 3);

    let err = Path::parse("a.b{2").unwrap_err();
    assert_eq!(err.position, 3);
    let err = Path::parse("f(1, 2").unwrap_err();
    assert_eq!(err.position, 1);

    let empty_root = Graph::nil().get("");
    assert!(empty_root.is_empty());
    assert_eq!(abcb().get("").len(), 1);
}
