use alloc::{string::String, vec::Vec};

use crate::{Field, FromXml, Schema, index::Index, path};

#[derive(Default, Debug)]
struct Person {
    name: String,
    age: u32,
}

impl FromXml for Person {
    fn schema() -> Schema {
        Schema::build::<Person>("Person")
            .field(Field::text("name", |p: &mut Person, v: String| p.name = v).at("Name"))
            .field(
                Field::text("age", |p: &mut Person, v: u32| p.age = v)
                    .at("Name")
                    .attr("age"),
            )
            .finish()
    }
}

#[test]
fn compiling_twice_yields_structurally_equal_indexes() {
    let first = Index::compile(&Person::schema(), "Person").unwrap();
    let second = Index::compile(&Person::schema(), "Person").unwrap();
    assert_eq!(first.writer_counts(), second.writer_counts());
}

#[test]
fn writers_land_at_the_expected_paths() {
    let index = Index::compile(&Person::schema(), "Person").unwrap();
    assert_eq!(
        index.writer_counts(),
        [
            (path!["Person"], 1),
            (path!["Person", "Name"], 1),
            (path!["Person", "Name"; "age"], 1),
        ]
    );
}

#[test]
fn the_root_tag_comes_from_the_document_not_the_schema() {
    // The same schema compiled under a different root binds its relative
    // paths under that root.
    let index = Index::compile(&Person::schema(), "Employee").unwrap();
    let paths: Vec<_> = index.writer_counts().into_iter().map(|(p, _)| p).collect();
    assert!(paths.contains(&path!["Employee", "Name"]));
}

#[test]
fn fields_mapping_to_one_path_accumulate_writers_in_declaration_order() {
    #[derive(Default)]
    struct Pair {
        first: String,
        second: String,
    }
    impl FromXml for Pair {
        fn schema() -> Schema {
            Schema::build::<Pair>("Pair")
                .field(Field::text("first", |p: &mut Pair, v: String| p.first = v).at("Both"))
                .field(Field::text("second", |p: &mut Pair, v: String| p.second = v).at("Both"))
                .finish()
        }
    }
    let index = Index::compile(&Pair::schema(), "Pair").unwrap();
    assert_eq!(
        index.writer_counts(),
        [(path!["Pair"], 1), (path!["Pair", "Both"], 2)]
    );
}

#[test]
fn both_fields_at_a_shared_path_receive_the_value() {
    use crate::{Binder, BinderOptions, StrSource};

    #[derive(Default)]
    struct Pair {
        first: String,
        second: String,
    }
    impl FromXml for Pair {
        fn schema() -> Schema {
            Schema::build::<Pair>("Pair")
                .field(Field::text("first", |p: &mut Pair, v: String| p.first = v).at("Both"))
                .field(Field::text("second", |p: &mut Pair, v: String| p.second = v).at("Both"))
                .finish()
        }
    }
    let pair: Pair = Binder::new(BinderOptions::default())
        .read(StrSource::new("<Pair><Both>x</Both></Pair>"))
        .unwrap();
    assert_eq!(pair.first, "x");
    assert_eq!(pair.second, "x");
}

#[test]
fn sibling_item_tags_compile_to_disjoint_paths() {
    #[derive(Default, Debug)]
    struct Place {
        name: String,
    }
    impl FromXml for Place {
        fn schema() -> Schema {
            Schema::build::<Place>("Place")
                .field(Field::text("name", |p: &mut Place, v: String| p.name = v).attr("name"))
                .finish()
        }
    }
    #[derive(Default)]
    struct Region {
        cities: Vec<Place>,
        towns: Vec<Place>,
    }
    impl FromXml for Region {
        fn schema() -> Schema {
            Schema::build::<Region>("Region")
                .field(Field::list("cities", |r: &mut Region, c| r.cities.push(c)).items("City"))
                .field(Field::list("towns", |r: &mut Region, t| r.towns.push(t)).items("Town"))
                .finish()
        }
    }
    let index = Index::compile(&Region::schema(), "Region").unwrap();
    let paths: Vec<_> = index.writer_counts().into_iter().map(|(p, _)| p).collect();
    assert!(paths.contains(&path!["Region", "City"]));
    assert!(paths.contains(&path!["Region", "Town"]));
    // The path key carries the literal item tag, so occurrences can never
    // be routed ambiguously.
    assert!(!paths.contains(&path!["Region", "City", "Town"]));
}
