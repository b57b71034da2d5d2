use alloc::{string::String, vec::Vec};

use crate::{Arg, Binder, BinderOptions, Field, FromXml, Schema, StrSource};

fn binder() -> Binder {
    Binder::new(BinderOptions::default())
}

/// Constructor-only target: no field is ever mutated after construction.
#[derive(Debug, PartialEq)]
struct Credentials {
    name: String,
    last_name: String,
}

impl FromXml for Credentials {
    fn schema() -> Schema {
        Schema::record::<Credentials>("Credentials")
            .arg(Arg::text::<String>("name").at("Name"))
            .arg(Arg::text::<String>("last_name").at("LastName"))
            .construct(|args| Credentials {
                name: args.take(0),
                last_name: args.take(1),
            })
    }
}

#[test]
fn record_constructed_at_closing_time() {
    let credentials: Credentials = binder()
        .read(StrSource::new(
            "<Credentials><Name>John</Name><LastName>Doe</LastName></Credentials>",
        ))
        .unwrap();
    assert_eq!(
        credentials,
        Credentials {
            name: "John".into(),
            last_name: "Doe".into(),
        }
    );
}

#[test]
fn unbound_arguments_fall_back_to_zero_values_not_errors() {
    let credentials: Credentials = binder()
        .read(StrSource::new("<Credentials><Name>John</Name></Credentials>"))
        .unwrap();
    assert_eq!(credentials.name, "John");
    assert_eq!(credentials.last_name, "");
}

#[test]
fn numeric_and_boolean_zero_values() {
    #[derive(Debug, PartialEq)]
    struct Sample {
        count: u64,
        ratio: f64,
        enabled: bool,
        initial: char,
    }
    impl FromXml for Sample {
        fn schema() -> Schema {
            Schema::record::<Sample>("Sample")
                .arg(Arg::text::<u64>("count").at("Count"))
                .arg(Arg::text::<f64>("ratio").at("Ratio"))
                .arg(Arg::text::<bool>("enabled").at("Enabled"))
                .arg(Arg::text::<char>("initial").at("Initial"))
                .construct(|args| Sample {
                    count: args.take(0),
                    ratio: args.take(1),
                    enabled: args.take(2),
                    initial: args.take(3),
                })
        }
    }

    let sample: Sample = binder()
        .read(StrSource::new("<Sample><Count>9</Count></Sample>"))
        .unwrap();
    assert_eq!(sample.count, 9);
    assert_eq!(sample.ratio, 0.0);
    assert!(!sample.enabled);
    assert_eq!(sample.initial, '\0');
}

#[test]
fn record_arguments_from_attributes() {
    #[derive(Debug, PartialEq)]
    struct Point {
        x: f64,
        y: f64,
    }
    impl FromXml for Point {
        fn schema() -> Schema {
            Schema::record::<Point>("Point")
                .arg(Arg::text::<f64>("x").attr("x"))
                .arg(Arg::text::<f64>("y").attr("y"))
                .construct(|args| Point {
                    x: args.take(0),
                    y: args.take(1),
                })
        }
    }

    let point: Point = binder()
        .read(StrSource::new(r#"<Point x="1.5" y="-2"/>"#))
        .unwrap();
    assert_eq!(point, Point { x: 1.5, y: -2.0 });
}

#[test]
fn record_nested_inside_a_mutable_parent() {
    #[derive(Default, Debug)]
    struct Account {
        owner: String,
        credentials: Option<Credentials>,
    }
    impl FromXml for Account {
        fn schema() -> Schema {
            Schema::build::<Account>("Account")
                .field(Field::text("owner", |a: &mut Account, v: String| a.owner = v).at("Owner"))
                .field(
                    Field::nested("credentials", |a: &mut Account, c| a.credentials = Some(c))
                        .at("Credentials"),
                )
                .finish()
        }
    }

    let account: Account = binder()
        .read(StrSource::new(
            "<Account><Owner>root</Owner><Credentials><Name>John</Name></Credentials></Account>",
        ))
        .unwrap();
    assert_eq!(account.owner, "root");
    let credentials = account.credentials.unwrap();
    assert_eq!(credentials.name, "John");
    assert_eq!(credentials.last_name, "");
}

#[test]
fn mutable_type_nested_inside_a_record() {
    #[derive(Default, Debug, PartialEq)]
    struct Door {
        width: u32,
    }
    impl FromXml for Door {
        fn schema() -> Schema {
            Schema::build::<Door>("Door")
                .field(Field::text("width", |d: &mut Door, v: u32| d.width = v).at("Width"))
                .finish()
        }
    }
    #[derive(Debug, PartialEq)]
    struct House {
        street: String,
        door: Door,
    }
    impl FromXml for House {
        fn schema() -> Schema {
            Schema::record::<House>("House")
                .arg(Arg::text::<String>("street").at("Street"))
                .arg(Arg::nested::<Door>("door").at("Door"))
                .construct(|args| House {
                    street: args.take(0),
                    door: args.take(1),
                })
        }
    }

    let house: House = binder()
        .read(StrSource::new(
            "<House><Street>Main</Street><Door><Width>90</Width></Door></House>",
        ))
        .unwrap();
    assert_eq!(house.street, "Main");
    assert_eq!(house.door, Door { width: 90 });
}

#[test]
fn record_collects_repeated_elements_into_a_slot() {
    #[derive(Default, Debug, PartialEq)]
    struct Stop {
        name: String,
    }
    impl FromXml for Stop {
        fn schema() -> Schema {
            Schema::build::<Stop>("Stop")
                .field(Field::text("name", |s: &mut Stop, v: String| s.name = v).attr("name"))
                .finish()
        }
    }
    #[derive(Debug)]
    struct Route {
        id: String,
        stops: Vec<Stop>,
    }
    impl FromXml for Route {
        fn schema() -> Schema {
            Schema::record::<Route>("Route")
                .arg(Arg::text::<String>("id").attr("id"))
                .arg(Arg::list::<Stop>("stops").items("Stop"))
                .construct(|args| Route {
                    id: args.take(0),
                    stops: args.take(1),
                })
        }
    }

    let route: Route = binder()
        .read(StrSource::new(
            r#"<Route id="7"><Stop name="a"/><Stop name="b"/></Route>"#,
        ))
        .unwrap();
    assert_eq!(route.id, "7");
    let names: Vec<&str> = route.stops.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}
