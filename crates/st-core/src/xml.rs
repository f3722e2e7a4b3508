//! XML codec for the SlimTimer wire format.
//!
//! Responses are read event by event into a small element tree, then
//! converted into [`Task`]/[`Entry`]. Element text is kept exactly as sent.
//! Requests are written the same way so element order and the `type`
//! attributes match what the service expects.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use thiserror::Error;

use crate::entry::{Entry, EntryTags};
use crate::task::{Person, Task};
use crate::timestamp::{format_completed_on, format_timestamp, parse_timestamp};

/// Matches a quoted tag (kept with its quotes) or a bare run between commas.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*"|[^," \t][^,"]+[^," \t]"#).unwrap());

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The body was not well-formed XML.
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),
    /// The body held no root element.
    #[error("empty XML document")]
    Empty,
    /// A required element was absent or empty.
    #[error("missing `{0}` element")]
    MissingField(&'static str),
    /// A numeric element did not parse.
    #[error("invalid `{field}` value: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    /// Writing a request body failed.
    #[error("failed to write XML: {0}")]
    Write(String),
}

/// Credentials returned by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub access_token: String,
    pub user_id: String,
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .finish()
    }
}

// ========== Response tree ==========

/// An element read from a response body: its local name, its own text
/// content (exactly as sent, entities resolved) and its child elements.
#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Self>,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Text of the first child called `name`, or `""` when it is absent.
    fn text_of(&self, name: &str) -> &str {
        self.child(name).map_or("", |child| child.text.as_str())
    }
}

/// Read a whole document into a tree rooted at its first element.
///
/// Text is kept verbatim. Attributes such as `type` are ignored.
fn read_tree(xml: &str) -> Result<Node, CodecError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().expand_empty_elements = true;

    let mut open: Vec<Node> = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(start) => open.push(Node {
                name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                ..Node::default()
            }),
            Event::End(_) => {
                let Some(node) = open.pop() else {
                    return Err(CodecError::Empty);
                };
                match open.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::Text(text) => {
                if let Some(node) = open.last_mut() {
                    node.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(node) = open.last_mut() {
                    node.text.push_str(&data.decode().map_err(quick_xml::Error::from)?);
                }
            }
            Event::Eof => {
                let Some(node) = open.pop() else {
                    return Err(CodecError::Empty);
                };
                let unclosed = IllFormedError::MissingEndTag(node.name);
                return Err(quick_xml::Error::from(unclosed).into());
            }
            _ => {}
        }
    }
}

fn required<'a>(node: &'a Node, name: &'static str) -> Result<&'a str, CodecError> {
    let value = node.text_of(name).trim();
    if value.is_empty() {
        return Err(CodecError::MissingField(name));
    }
    Ok(value)
}

fn integer(node: &Node, name: &'static str) -> Result<i64, CodecError> {
    let value = required(node, name)?;
    value.parse().map_err(|_| CodecError::InvalidNumber {
        field: name,
        value: value.to_string(),
    })
}

fn id(node: &Node) -> Result<u64, CodecError> {
    let value = required(node, "id")?;
    value.parse().map_err(|_| CodecError::InvalidNumber {
        field: "id",
        value: value.to_string(),
    })
}

/// Unparsable dates become `None` rather than failing the whole record.
fn date(node: &Node, name: &'static str) -> Option<DateTime<Utc>> {
    let value = node.text_of(name).trim();
    if value.is_empty() {
        return None;
    }
    let parsed = parse_timestamp(value);
    if parsed.is_none() {
        tracing::warn!(field = name, value, "dropping unparsable timestamp");
    }
    parsed
}

fn people(node: &Node, list: &str) -> Vec<Person> {
    node.child(list)
        .into_iter()
        .flat_map(|list| list.children_named("person"))
        .map(|person| Person {
            name: person.text_of("name").to_string(),
            user_id: person.text_of("user-id").to_string(),
            email: person.text_of("email").to_string(),
        })
        .collect()
}

fn emails(node: &Node, list: &str) -> Vec<String> {
    people(node, list).into_iter().map(|person| person.email).collect()
}

fn task_from_node(node: &Node) -> Result<Task, CodecError> {
    let mut task = Task::new(node.text_of("name"));
    task.id = id(node)?;

    let tags = node.text_of("tags");
    if !tags.is_empty() {
        task.tags = parse_tags(tags);
    }

    task.coworkers = emails(node, "coworkers");
    task.reporters = emails(node, "reporters");
    task.owner = people(node, "owners")
        .into_iter()
        .next()
        .map(|owner| owner.email)
        .unwrap_or_default();

    task.complete = !node.text_of("completed-on").trim().is_empty();
    if task.complete {
        task.completed_on = date(node, "completed-on");
    }

    let hours = node.text_of("hours").trim();
    if !hours.is_empty() {
        task.hours = hours.parse().map_err(|_| CodecError::InvalidNumber {
            field: "hours",
            value: hours.to_string(),
        })?;
    }

    task.created_at = date(node, "created-at");
    task.updated_at = date(node, "updated-at");
    Ok(task)
}

fn entry_from_node(node: &Node) -> Result<Entry, CodecError> {
    let task = node.child("task").ok_or(CodecError::MissingField("task"))?;
    Ok(Entry {
        id: id(node)?,
        start_time: date(node, "start-time"),
        end_time: date(node, "end-time"),
        duration: integer(node, "duration-in-seconds")?,
        tags: EntryTags::Text(node.text_of("tags").to_string()),
        comments: node.text_of("comments").to_string(),
        task: task_from_node(task)?,
    })
}

// ========== Parsing ==========

/// Split a server tag string into tags.
///
/// Quoted segments keep their quotes and may contain commas and spaces.
/// Bare tokens are trimmed runs between commas of at least three characters.
pub fn parse_tags(text: &str) -> Vec<String> {
    TAG_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse a single `<task>` document.
pub fn parse_task(xml: &str) -> Result<Task, CodecError> {
    task_from_node(&read_tree(xml)?)
}

/// Parse a `<tasks>` listing.
pub fn parse_tasks(xml: &str) -> Result<Vec<Task>, CodecError> {
    let root = read_tree(xml)?;
    root.children_named("task").map(task_from_node).collect()
}

/// Parse a single `<time-entry>` document.
pub fn parse_time_entry(xml: &str) -> Result<Entry, CodecError> {
    entry_from_node(&read_tree(xml)?)
}

/// Parse a `<time-entries>` listing.
pub fn parse_time_entries(xml: &str) -> Result<Vec<Entry>, CodecError> {
    let root = read_tree(xml)?;
    root.children_named("time-entry").map(entry_from_node).collect()
}

/// Parse the token endpoint response.
pub fn parse_auth_token(xml: &str) -> Result<AuthToken, CodecError> {
    let root = read_tree(xml)?;
    Ok(AuthToken {
        access_token: required(&root, "access-token")?.to_string(),
        user_id: required(&root, "user-id")?.to_string(),
    })
}

// ========== Writing ==========

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), CodecError> {
    writer
        .write_event(event)
        .map_err(|err| CodecError::Write(err.to_string()))
}

/// Write `<name type="kind">text</name>`. Empty text still yields an
/// open/close pair.
fn element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    kind: Option<&str>,
    text: &str,
) -> Result<(), CodecError> {
    let mut start = BytesStart::new(name);
    if let Some(kind) = kind {
        start.push_attribute(("type", kind));
    }
    emit(writer, Event::Start(start))?;
    if !text.is_empty() {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn document<F>(root: &str, body: F) -> Result<String, CodecError>
where
    F: FnOnce(&mut Writer<Vec<u8>>) -> Result<(), CodecError>,
{
    let mut writer = Writer::new(Vec::new());
    emit(&mut writer, Event::Start(BytesStart::new(root)))?;
    body(&mut writer)?;
    emit(&mut writer, Event::End(BytesEnd::new(root)))?;
    String::from_utf8(writer.into_inner()).map_err(|err| CodecError::Write(err.to_string()))
}

/// Body of the token request.
pub fn login_request(email: &str, password: &str, api_key: &str) -> Result<String, CodecError> {
    document("request", |w| {
        emit(w, Event::Start(BytesStart::new("user")))?;
        element(w, "email", None, email)?;
        element(w, "password", None, password)?;
        emit(w, Event::End(BytesEnd::new("user")))?;
        element(w, "api-key", None, api_key)
    })
}

/// Serialize a task for create or update.
///
/// `now` is written as the completion time when the task is complete; an
/// open task sends an empty `completed_on` so the server clears it.
pub fn serialize_task(task: &Task, now: DateTime<Utc>) -> Result<String, CodecError> {
    document("task", |w| {
        if task.id != 0 {
            element(w, "id", Some("integer"), &task.id.to_string())?;
        }
        element(w, "name", None, &task.name)?;
        if !task.tags.is_empty() {
            element(w, "tags", None, &task.tags.join(","))?;
        }
        if !task.coworkers.is_empty() {
            element(w, "coworker_emails", None, &task.coworkers.join(","))?;
        }
        if !task.reporters.is_empty() {
            element(w, "reporter_emails", None, &task.reporters.join(","))?;
        }
        let completed_on = if task.complete {
            format_completed_on(&now)
        } else {
            String::new()
        };
        element(w, "completed_on", None, &completed_on)
    })
}

/// Serialize a time entry for create or update.
pub fn serialize_time_entry(entry: &Entry) -> Result<String, CodecError> {
    let start_time = entry
        .start_time
        .ok_or(CodecError::MissingField("start-time"))?;
    document("time-entry", |w| {
        if entry.id != 0 {
            element(w, "id", Some("integer"), &entry.id.to_string())?;
        }
        element(w, "start-time", Some("datetime"), &format_timestamp(&start_time))?;
        element(
            w,
            "duration-in-seconds",
            Some("integer"),
            &entry.duration_in_seconds().to_string(),
        )?;
        element(w, "task-id", Some("integer"), &entry.task.id.to_string())?;
        if !entry.tags.is_empty() {
            element(w, "tags", None, &entry.tags.to_wire())?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;

    const TASK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<task>
  <id type="integer">1021</id>
  <name>Write report</name>
  <tags>writing, "q1, q2", admin</tags>
  <hours type="float">2.5</hours>
  <role>owner,coworker</role>
  <completed-on type="datetime">2008-03-15T17:00:00Z</completed-on>
  <created-at type="datetime">2008-03-14T09:26:53Z</created-at>
  <updated-at type="datetime">not a date</updated-at>
  <owners type="array">
    <person>
      <name>Ann Owner</name>
      <user-id type="integer">7</user-id>
      <email>ann@example.com</email>
    </person>
  </owners>
  <coworkers type="array">
    <person>
      <name>Bob</name>
      <user-id type="integer">8</user-id>
      <email>bob@example.com</email>
    </person>
    <person>
      <name>Cat</name>
      <user-id type="integer">9</user-id>
      <email>cat@example.com</email>
    </person>
  </coworkers>
  <reporters type="array"></reporters>
</task>"#;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn parse_tags_keeps_quoted_segments() {
        assert_eq!(
            parse_tags(r#"foo, "bar, baz", qux"#),
            vec!["foo", "\"bar, baz\"", "qux"]
        );
    }

    #[test]
    fn parse_tags_skips_short_bare_tokens() {
        assert_eq!(parse_tags("ab, client work,x"), vec!["client work"]);
    }

    #[test]
    fn parse_task_reads_all_fields() {
        let task = parse_task(TASK_XML).unwrap();
        assert_eq!(task.id(), 1021);
        assert_eq!(task.name, "Write report");
        assert_eq!(task.tags, vec!["writing", "\"q1, q2\"", "admin"]);
        assert_eq!(task.coworkers, vec!["bob@example.com", "cat@example.com"]);
        assert!(task.reporters.is_empty());
        assert_eq!(task.owner(), "ann@example.com");
        assert!(task.complete);
        assert!((task.hours() - 2.5).abs() < f64::EPSILON);
        assert_eq!(
            task.completed_on(),
            Some(Utc.with_ymd_and_hms(2008, 3, 15, 17, 0, 0).unwrap())
        );
        assert_eq!(
            task.created_at(),
            Some(Utc.with_ymd_and_hms(2008, 3, 14, 9, 26, 53).unwrap())
        );
        assert!(task.updated_at().is_none());
    }

    #[test]
    fn parse_task_without_completion_is_open() {
        let xml = r#"<task>
  <id type="integer">5</id>
  <name>Open</name>
  <hours type="float">0.0</hours>
  <completed-on type="datetime" nil="true"></completed-on>
</task>"#;
        let task = parse_task(xml).unwrap();
        assert!(!task.complete);
        assert!(task.completed_on().is_none());
        assert!(task.tags.is_empty());
        assert!(task.coworkers.is_empty());
        assert_eq!(task.owner(), "");
    }

    #[test]
    fn parse_task_requires_id() {
        let err = parse_task("<task><name>No id</name></task>").unwrap_err();
        assert!(matches!(err, CodecError::MissingField("id")));
    }

    #[test]
    fn parse_task_rejects_bad_hours() {
        let err = parse_task("<task><id>1</id><hours>lots</hours></task>").unwrap_err();
        assert!(matches!(err, CodecError::InvalidNumber { field: "hours", .. }));
    }

    #[test]
    fn parse_tasks_reads_listing() {
        let xml = r#"<tasks type="array">
  <task><id type="integer">1</id><name>One</name></task>
  <task><id type="integer">2</id><name>Two</name></task>
</tasks>"#;
        let tasks = parse_tasks(xml).unwrap();
        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["One", "Two"]);
    }

    #[test]
    fn parse_time_entry_reads_nested_task() {
        let xml = r#"<time-entry>
  <id type="integer">300</id>
  <start-time type="datetime">2024-05-01T09:00:00Z</start-time>
  <end-time type="datetime">2024-05-01T10:30:00Z</end-time>
  <duration-in-seconds type="integer">5400</duration-in-seconds>
  <tags>review, "a, b"</tags>
  <comments>Went long</comments>
  <task>
    <id type="integer">1021</id>
    <name>Write report</name>
  </task>
</time-entry>"#;
        let entry = parse_time_entry(xml).unwrap();
        assert_eq!(entry.id(), 300);
        assert_eq!(entry.start_time, Some(ts(9, 0, 0)));
        assert_eq!(entry.end_time, Some(ts(10, 30, 0)));
        assert_eq!(entry.duration, 5400);
        assert_eq!(entry.tags, EntryTags::Text("review, \"a, b\"".to_string()));
        assert_eq!(entry.comments, "Went long");
        assert_eq!(entry.task.id(), 1021);
    }

    #[test]
    fn parse_time_entry_requires_task() {
        let xml =
            "<time-entry><id>1</id><duration-in-seconds>60</duration-in-seconds></time-entry>";
        let err = parse_time_entry(xml).unwrap_err();
        assert!(matches!(err, CodecError::MissingField("task")));
    }

    #[test]
    fn parse_auth_token_reads_both_fields() {
        let xml = "<response><access-token>abc123</access-token><user-id>42</user-id></response>";
        let token = parse_auth_token(xml).unwrap();
        assert_eq!(token.access_token, "abc123");
        assert_eq!(token.user_id, "42");
        assert!(!format!("{token:?}").contains("abc123"));
    }

    #[test]
    fn parse_auth_token_requires_user_id() {
        let err = parse_auth_token("<response><access-token>abc</access-token></response>")
            .unwrap_err();
        assert!(matches!(err, CodecError::MissingField("user-id")));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(matches!(
            parse_task("<task><id>1</task>"),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn truncated_body_is_an_error() {
        assert!(matches!(
            parse_task("<task><id>1</id>"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(parse_tasks("  "), Err(CodecError::Empty)));
    }

    #[test]
    fn parse_keeps_surrounding_whitespace_in_text() {
        let xml = "<tasks><task><id>4</id><name>  Inbox </name></task></tasks>";
        let tasks = parse_tasks(xml).unwrap();
        assert_eq!(tasks[0].name, "  Inbox ");
    }

    #[test]
    fn padded_task_name_survives_server_echo() {
        let original = Task::new(" Plan sprint ");
        let request = serialize_task(&original, ts(8, 0, 0)).unwrap();
        let start = request.find("<name>").unwrap();
        let end = request.find("</name>").unwrap() + "</name>".len();
        let name_element = &request[start..end];
        assert_eq!(name_element, "<name> Plan sprint </name>");

        let echo = format!("<task><id>5</id>{name_element}</task>");
        let parsed = parse_task(&echo).unwrap();
        assert_eq!(parsed.name, original.name);
    }

    #[test]
    fn serialize_new_open_task() {
        let xml = serialize_task(&Task::new("Write docs"), ts(0, 0, 0)).unwrap();
        assert_snapshot!(xml, @"<task><name>Write docs</name><completed_on></completed_on></task>");
    }

    #[test]
    fn serialize_saved_complete_task() {
        let mut task = parse_task(TASK_XML).unwrap();
        task.tags = vec!["writing".to_string(), "admin".to_string()];
        task.reporters = vec!["rae@example.com".to_string()];
        let xml = serialize_task(&task, ts(12, 30, 5)).unwrap();
        assert_snapshot!(xml, @r#"<task><id type="integer">1021</id><name>Write report</name><tags>writing,admin</tags><coworker_emails>bob@example.com,cat@example.com</coworker_emails><reporter_emails>rae@example.com</reporter_emails><completed_on>2024-05-01 12:30:05</completed_on></task>"#);
    }

    #[test]
    fn serialized_task_survives_server_echo() {
        let mut original = Task::new("Plan sprint");
        original.tags = vec!["planning".to_string(), "\"team, all\"".to_string()];
        original.coworkers = vec!["bob@example.com".to_string()];
        original.reporters = vec!["rae@example.com".to_string(), "sam@example.com".to_string()];
        original.complete = true;

        let request = serialize_task(&original, ts(8, 0, 0)).unwrap();
        assert!(request.contains("<name>Plan sprint</name>"));

        let person = |email: &str| format!("<person><name>x</name><email>{email}</email></person>");
        let echo = format!(
            "<task><id>77</id><name>{}</name><tags>{}</tags><coworkers>{}</coworkers>\
             <reporters>{}</reporters><completed-on>2024-05-01T08:00:00Z</completed-on>\
             <hours>0</hours></task>",
            quick_xml::escape::escape(original.name.as_str()),
            quick_xml::escape::escape(original.tags.join(",").as_str()),
            original.coworkers.iter().map(|e| person(e)).collect::<String>(),
            original.reporters.iter().map(|e| person(e)).collect::<String>(),
        );
        let parsed = parse_task(&echo).unwrap();

        assert_eq!(parsed.id(), 77);
        assert_eq!(parsed.name, original.name);
        assert_eq!(parsed.tags, original.tags);
        assert_eq!(parsed.coworkers, original.coworkers);
        assert_eq!(parsed.reporters, original.reporters);
        assert_eq!(parsed.complete, original.complete);
    }

    #[test]
    fn serialize_entry_floors_zero_duration() {
        let mut task = Task::new("Docs");
        task.id = 12;
        let entry = Entry::new(task, ts(9, 0, 0), ts(9, 0, 0));
        let xml = serialize_time_entry(&entry).unwrap();
        assert_snapshot!(xml, @r#"<time-entry><start-time type="datetime">2024-05-01T09:00:00Z</start-time><duration-in-seconds type="integer">59</duration-in-seconds><task-id type="integer">12</task-id></time-entry>"#);
    }

    #[test]
    fn serialize_saved_entry_with_tags() {
        let mut entry = Entry::new(Task::new("Docs"), ts(9, 0, 0), ts(9, 45, 0));
        entry.id = 300;
        entry.tags = EntryTags::from(vec!["review".to_string(), "docs".to_string()]);
        entry.comments = "first pass".to_string();
        let xml = serialize_time_entry(&entry).unwrap();
        assert!(xml.starts_with(r#"<time-entry><id type="integer">300</id>"#));
        assert!(xml.contains(r#"<duration-in-seconds type="integer">2700</duration-in-seconds>"#));
        assert!(xml.contains(r#"<task-id type="integer">0</task-id>"#));
        assert!(xml.contains("<tags>review,docs</tags>"));
        assert!(!xml.contains("comments"));
    }

    #[test]
    fn serialize_entry_requires_start_time() {
        let mut entry = Entry::new(Task::new("Docs"), ts(9, 0, 0), ts(10, 0, 0));
        entry.start_time = None;
        let err = serialize_time_entry(&entry).unwrap_err();
        assert!(matches!(err, CodecError::MissingField("start-time")));
    }

    #[test]
    fn login_request_escapes_credentials() {
        let xml = login_request("me@example.com", "p<w>&d", "KEY").unwrap();
        assert_snapshot!(xml, @"<request><user><email>me@example.com</email><password>p&lt;w&gt;&amp;d</password></user><api-key>KEY</api-key></request>");
    }
}
