use std::rc::Rc;
use std::sync::mpsc::channel;
use finance_db_lib::{quiet, Backend, ChannelNotifier, DatabaseConfig, Error, Event, FilterCondition, Record, SortOrder, Value};

fn backend() -> Backend {
    finance_db_lib::logging::init();
    return Backend::open(&DatabaseConfig::default()).unwrap();
}

fn record(pairs: &[(&str, Value)]) -> Record {
    return pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect();
}

#[test]
fn vendor_lifecycle() {
    let backend = backend();
    let (sender, receiver) = channel();
    let mut vendors = backend.access("Vendors", Rc::new(ChannelNotifier::new(sender))).unwrap();

    let id = vendors.add(&record(&[("name", Value::from("Acme")), ("city", Value::from("Springfield"))])).unwrap();
    let row = vendors.get(&id);
    assert_eq!(row.get("name"), Some(&Value::from("Acme")));
    assert_eq!(row.get("unpaid_balance"), Some(&Value::Float(0.0)));

    assert!(vendors.update(&id, &record(&[("unpaid_balance", Value::Float(99.95))])));
    assert!(vendors.remove(&id));
    assert!(!vendors.remove(&id));

    let events: Vec<Event> = receiver.try_iter().collect();
    let messages: Vec<String> = events.iter()
        .filter_map(|e| match e {
            Event::OperationSucceeded { message, .. } => Some(message.clone()),
            _ => None
        })
        .collect();
    assert_eq!(messages, vec!["added ID:", "get ID:", "updated ID:", "deleted ID:"]);
    assert!(matches!(events.last(), Some(Event::OperationFailed { .. })));
}

#[test]
fn vendors_reference_categories() {
    let backend = backend();
    let mut categories = backend.access("Categories", quiet()).unwrap();
    let mut vendors = backend.access("Vendors", quiet()).unwrap();

    let category = categories.add(&record(&[("name", Value::from("Utilities"))])).unwrap();
    let vendor = vendors.add(&record(&[("name", Value::from("Power Co")), ("category_id", Value::from(category.as_str()))]));
    assert!(vendor.is_some());

    // Restricted while a vendor still points at it
    assert!(!categories.remove(&category));
    assert!(vendors.add(&record(&[("name", Value::from("Ghost")), ("category_id", Value::from("no such category"))])).is_none());
}

#[test]
fn model_and_state_share_preferences() {
    let backend = backend();
    {
        let mut model = backend.model("Vendors", quiet()).unwrap();
        model.sort_by("unpaid_balance", "");
    }
    let mut state = backend.state("VendorsTableModel").unwrap();
    assert_eq!(state.restore("sortColumn", "name"), "unpaid_balance");
    assert_eq!(state.restore_sort_order("sortOrder", SortOrder::Descending), SortOrder::Ascending);
}

#[test]
fn filtered_select() {
    let backend = backend();
    let mut categories = backend.access("Categories", quiet()).unwrap();
    categories.add(&record(&[("name", Value::from("Salary")), ("type", Value::Int(0))])).unwrap();
    categories.add(&record(&[("name", Value::from("Rent")), ("type", Value::Int(1))])).unwrap();

    let income = categories.select(&[FilterCondition::equals("type", 0i64), FilterCondition::equals("nope", 1i64)], None, SortOrder::Ascending, false).unwrap();
    assert_eq!(income.len(), 1);
    assert_eq!(income[0].get("name"), Some(&Value::from("Salary")));
}

#[test]
fn unknown_table() {
    let backend = backend();
    assert!(matches!(backend.access("Nope", quiet()), Err(Error::UnknownTable(_))));
}
