use std::{
    fs,
    path::{Path, PathBuf},
};

use assertor::{assert_that, EqualityAssertion, VecAssertion};
use pretty_assertions::assert_eq;
use quick_xml::{events::Event, Reader};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tempdir::TempDir;
use xmlsplit_core::{
    error::{ConfigError, InputError},
    split_xml_file, CancellationToken, SplitConfig, SplitError,
};

/// What a chunk file contains
#[derive(Debug)]
struct Chunk {
    root: String,
    /// Text of the `id` child of every direct child of the root
    ids: Vec<String>,
    /// Names of all direct children of the root
    children: Vec<String>,
}

/// Parse a chunk file and check that it is a single well-formed document
/// with an XML declaration
fn read_chunk(path: &Path) -> Chunk {
    let xml = fs::read_to_string(path).unwrap();
    let mut reader = Reader::from_str(&xml);
    reader.trim_text(true);

    let mut declarations = 0;
    let mut roots = Vec::new();
    let mut ids = Vec::new();
    let mut children = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Decl(_) => {
                assert!(roots.is_empty(), "declaration after root in {path:?}");
                declarations += 1;
            }
            Event::Start(s) => {
                let name = String::from_utf8(s.name().as_ref().to_vec()).unwrap();
                match stack.len() {
                    0 => roots.push(name.clone()),
                    1 => children.push(name.clone()),
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(s) => {
                let name = String::from_utf8(s.name().as_ref().to_vec()).unwrap();
                match stack.len() {
                    0 => roots.push(name),
                    1 => children.push(name),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if stack.len() == 3 && stack[2] == "id" {
                    ids.push(t.unescape().unwrap().into_owned());
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    assert_eq!(declarations, 1, "{path:?} must have one declaration");
    assert_eq!(roots.len(), 1, "{path:?} must have one root element");
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));

    Chunk {
        root: roots.remove(0),
        ids,
        children,
    }
}

fn products_minified(n: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Products>");
    for i in 1..=n {
        xml.push_str(&format!(
            "<Product><id>{i}</id><name>Product {i}</name><price>{i}.99</price></Product>"
        ));
    }
    xml.push_str("</Products>");
    xml
}

fn products_pretty(n: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Products>\n");
    for i in 1..=n {
        xml.push_str(&format!(
            "  <Product>\n    <id>{i}</id>\n    <name>Product {i}</name>\n  </Product>\n"
        ));
    }
    xml.push_str("</Products>\n");
    xml
}

struct Fixture {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new(file_name: &str, xml: &str) -> Self {
        let dir = TempDir::new("xmlsplit").unwrap();
        let input = dir.path().join(file_name);
        fs::write(&input, xml).unwrap();
        let output = dir.path().join("out");
        fs::create_dir(&output).unwrap();
        Self { dir, input, output }
    }

    fn split(&self, count: usize, root: &str) -> Result<Vec<PathBuf>, SplitError> {
        let config = SplitConfig::new("Product", &self.output, count, root).unwrap();
        split_xml_file(&self.input, &config, &CancellationToken::new())
            .map(|r| r.into_file_paths())
    }

    fn output_files(&self) -> usize {
        fs::read_dir(&self.output).unwrap().count()
    }
}

#[test]
fn minified_even() {
    let f = Fixture::new("12_products_minified.xml", &products_minified(12));
    let paths = f.split(4, "root").unwrap();

    assert_that!(paths).has_length(3);
    assert_eq!(
        paths,
        (0..3)
            .map(|i| f.output.join(format!("12_products_minified.xml.{i}.part")))
            .collect::<Vec<_>>()
    );

    let chunks: Vec<_> = paths.iter().map(|p| read_chunk(p)).collect();
    assert_eq!(chunks[0].ids.last().unwrap(), "4");
    assert_eq!(chunks[1].ids.len(), 4);
    assert_eq!(chunks[1].ids.last().unwrap(), "8");
    assert_eq!(chunks[2].ids.len(), 4);
    for chunk in &chunks {
        assert_eq!(chunk.root, "root");
        assert!(chunk.children.iter().all(|c| c == "Product"));
    }
}

#[test]
fn byte_order_mark() {
    let xml = format!("\u{feff}{}", products_minified(12));
    let f = Fixture::new("bom.xml", &xml);
    let paths = f.split(4, "root").unwrap();

    assert_that!(paths).has_length(3);
    let ids: Vec<String> = paths.iter().flat_map(|p| read_chunk(p).ids).collect();
    let expected: Vec<String> = (1..=12).map(|i| i.to_string()).collect();
    assert_eq!(ids, expected);

    let chunk = fs::read_to_string(&paths[0]).unwrap();
    assert!(chunk.contains(
        "\n  <Product><id>1</id><name>Product 1</name><price>1.99</price></Product>\n"
    ));
}

/// Elements are copied as they are, whatever the declared encoding
#[test]
fn other_declared_encoding() {
    let xml = products_pretty(3).replace("UTF-8", "ISO-8859-1");
    let f = Fixture::new("latin1.xml", &xml);
    let paths = f.split(2, "root").unwrap();

    assert_that!(paths).has_length(2);
    assert_eq!(read_chunk(&paths[0]).ids, vec!["1", "2"]);
    assert_eq!(read_chunk(&paths[1]).ids, vec!["3"]);
}

#[test]
fn pretty_uneven() {
    let f = Fixture::new("12_products_pretty.xml", &products_pretty(12));
    let paths = f.split(10, "root").unwrap();

    assert_that!(paths).has_length(2);
    let first = read_chunk(&paths[0]);
    let last = read_chunk(&paths[1]);
    assert_eq!(first.ids.len(), 10);
    assert_eq!(first.ids.last().unwrap(), "10");
    assert_eq!(last.ids, vec!["11", "12"]);
}

#[test]
fn pretty_not_full() {
    let f = Fixture::new("12_products_pretty.xml", &products_pretty(12));
    let paths = f.split(20, "TestRoot").unwrap();

    assert_that!(paths).has_length(1);
    let chunk = read_chunk(&paths[0]);
    assert_eq!(chunk.root, "TestRoot");
    assert_eq!(chunk.ids.len(), 12);
    assert_eq!(chunk.ids.last().unwrap(), "12");
}

#[test]
fn no_matches() {
    let f = Fixture::new("empty.xml", "<?xml version=\"1.0\"?><Products><Other/></Products>");
    let paths = f.split(3, "root").unwrap();
    assert_that!(paths).is_empty();
    assert_eq!(f.output_files(), 0);
}

#[test]
fn one_element_per_file() {
    let f = Fixture::new("p.xml", &products_minified(5));
    let paths = f.split(1, "root").unwrap();
    assert_that!(paths).has_length(5);
    for (i, path) in paths.iter().enumerate() {
        assert_eq!(read_chunk(path).ids, vec![(i + 1).to_string()]);
    }
}

/// Chunk counts and contents for random element and chunk sizes
#[test]
fn random_sizes() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..20 {
        let n = rng.gen_range(0..60);
        let k = rng.gen_range(1..15);
        let xml = if rng.gen_bool(0.5) {
            products_minified(n)
        } else {
            products_pretty(n)
        };
        let f = Fixture::new("r.xml", &xml);
        let paths = f.split(k, "root").unwrap();

        assert_eq!(paths.len(), n.div_ceil(k), "n = {n}, k = {k}");
        assert_eq!(f.output_files(), paths.len());

        let chunks: Vec<_> = paths.iter().map(|p| read_chunk(p)).collect();
        for (i, chunk) in chunks.iter().enumerate() {
            if i + 1 < chunks.len() {
                assert_eq!(chunk.ids.len(), k);
            } else {
                assert!((1..=k).contains(&chunk.ids.len()));
            }
        }

        // all elements come back in source order
        let ids: Vec<String> = chunks.into_iter().flat_map(|c| c.ids).collect();
        let expected: Vec<String> = (1..=n).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }
}

/// Putting the captured elements of all chunks back under one root gives
/// the same elements as the source
#[test]
fn round_trip() {
    let source = "<r>\n<Product a=\"1\"><x>&amp;</x></Product><Product/>\n<g><Product b=\"2\">\n  <y/>\n</Product></g></r>";
    let f = Fixture::new("rt.xml", source);
    let paths = f.split(2, "root").unwrap();

    let mut flattened = String::new();
    for path in &paths {
        let chunk = fs::read_to_string(path).unwrap();
        let body = chunk
            .split_once("<root>")
            .and_then(|(_, rest)| rest.rsplit_once("</root>"))
            .map(|(body, _)| body)
            .unwrap();
        for line in body.split("\n  <Product").filter(|l| !l.trim().is_empty()) {
            flattened.push_str("<Product");
            flattened.push_str(line.trim_end());
            flattened.push('|');
        }
    }

    assert_eq!(
        flattened,
        "<Product a=\"1\"><x>&amp;</x></Product>|<Product/>|<Product b=\"2\">\n  <y/>\n</Product>|"
    );
}

#[test]
fn zero_count_is_rejected() {
    let f = Fixture::new("p.xml", &products_minified(3));
    assert_that!(SplitConfig::new("Product", &f.output, 0, "root"))
        .is_equal_to(Err(ConfigError::ZeroElementCount));
    assert_eq!(f.output_files(), 0);
}

#[test]
fn missing_input() {
    let f = Fixture::new("p.xml", &products_minified(3));
    let config = SplitConfig::new("Product", &f.output, 2, "root").unwrap();
    let missing = f.dir.path().join("missing.xml");
    let err = split_xml_file(&missing, &config, &CancellationToken::new()).unwrap_err();
    match err {
        SplitError::Input { path, source } => {
            assert_eq!(path, missing);
            assert!(matches!(source, InputError::Io(_)));
        }
        e => panic!("unexpected error: {e:?}"),
    }
}

#[test]
fn malformed_input() {
    let f = Fixture::new("bad.xml", "<Products><Product><id>1</id></Product><Product>");
    let err = f.split(5, "root").unwrap_err();
    assert!(matches!(err, SplitError::Input { .. }));

    // the pending chunk is discarded
    assert_eq!(f.output_files(), 0);
}

#[test]
fn second_root_element() {
    let f = Fixture::new("two.xml", "<r><Product><id>1</id></Product></r><Product/>");
    let err = f.split(5, "root").unwrap_err();
    assert!(matches!(
        err,
        SplitError::Input {
            source: InputError::MultipleRoots,
            ..
        }
    ));
    assert_eq!(f.output_files(), 0);
}

#[test]
fn missing_output_directory() {
    let f = Fixture::new("p.xml", &products_minified(3));
    let config =
        SplitConfig::new("Product", f.dir.path().join("nope"), 2, "root").unwrap();
    let err = split_xml_file(&f.input, &config, &CancellationToken::new()).unwrap_err();
    match err {
        SplitError::Output(e) => {
            assert_eq!(e.path, f.dir.path().join("nope").join("p.xml.0.part"));
        }
        e => panic!("unexpected error: {e:?}"),
    }
}

#[test]
fn cancelled_before_start() {
    let f = Fixture::new("p.xml", &products_minified(3));
    let config = SplitConfig::new("Product", &f.output, 2, "root").unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = split_xml_file(&f.input, &config, &cancel).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(f.output_files(), 0);
}

#[test]
fn inherited_namespaces() {
    let source = r#"<gml:Collection xmlns:gml="http://www.opengis.net/gml" xmlns:app="urn:app"><gml:featureMember><app:Building gml:id="b1"/></gml:featureMember><gml:featureMember><app:Building gml:id="b2"/></gml:featureMember></gml:Collection>"#;
    let f = Fixture::new("city.gml", source);
    let config = SplitConfig::new("gml:featureMember", &f.output, 5, "root")
        .unwrap()
        .with_inherit_namespaces(true);
    let paths = split_xml_file(&f.input, &config, &CancellationToken::new())
        .unwrap()
        .into_file_paths();

    assert_that!(paths).has_length(1);
    let chunk = fs::read_to_string(&paths[0]).unwrap();
    assert!(chunk.contains(
        r#"<gml:featureMember xmlns:app="urn:app" xmlns:gml="http://www.opengis.net/gml"><app:Building gml:id="b1"/></gml:featureMember>"#
    ));
    assert_eq!(read_chunk(&paths[0]).children.len(), 2);
}
