//! WebDAV XML parsing and generation.
//!
//! Parsing uses `quick-xml`'s [`NsReader`] so elements are matched by the
//! `DAV:` namespace URI plus local name — never by a literal prefixed name;
//! clients may bind any prefix they like. Generation uses the writer API
//! through a multistatus builder.

use std::io::Cursor;

use quick_xml::{
  NsReader, Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
  name::{Namespace, ResolveResult},
};

use crate::{error::Error, lock::ActiveLock};

pub const NS_DAV: &str = "DAV:";

fn is_dav(resolve: &ResolveResult<'_>) -> bool {
  matches!(resolve, ResolveResult::Bound(Namespace(b"DAV:")))
}

fn local_of(e: &BytesStart<'_>) -> String {
  String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

// ─── PROPFIND request ────────────────────────────────────────────────────────

/// Validate a PROPFIND request body. The property filter itself is ignored —
/// responses always carry the fixed property set — but a body that is
/// present must still be well-formed XML.
pub fn parse_propfind(xml: &[u8]) -> Result<(), Error> {
  if xml.is_empty() {
    return Ok(());
  }
  let mut reader = NsReader::from_reader(xml);
  reader.config_mut().trim_text(true);
  let mut buf = Vec::new();
  loop {
    match reader.read_resolved_event_into(&mut buf) {
      Ok((_, Event::Eof)) => return Ok(()),
      Ok(_) => {}
      Err(e) => return Err(Error::InvalidXml(e.to_string())),
    }
    buf.clear();
  }
}

// ─── LOCK request ────────────────────────────────────────────────────────────

/// The three elements a lockinfo body must carry.
#[derive(Debug, PartialEq)]
pub struct LockRequest {
  /// Local name under `<lockscope>`: `exclusive` or `shared`.
  pub scope:     String,
  /// Local name under `<locktype>`; `write` is the only type RFC 4918
  /// defines.
  pub lock_type: String,
  pub owner:     String,
}

/// Parse a LOCK request body. Missing scope, type, or owner → 400.
pub fn parse_lock(xml: &[u8]) -> Result<LockRequest, Error> {
  if xml.is_empty() {
    return Err(Error::BadRequest("empty LOCK body".into()));
  }

  let mut reader = NsReader::from_reader(xml);
  reader.config_mut().trim_text(true);

  let mut scope: Option<String> = None;
  let mut lock_type: Option<String> = None;
  let mut owner = String::new();
  let (mut in_scope, mut in_type, mut in_owner) = (false, false, false);
  let mut buf = Vec::new();

  loop {
    match reader.read_resolved_event_into(&mut buf) {
      Ok((resolve, Event::Start(ref e) | Event::Empty(ref e))) => {
        let local = local_of(e);
        if is_dav(&resolve) {
          match local.as_str() {
            "lockscope" => in_scope = true,
            "locktype" => in_type = true,
            "owner" => in_owner = true,
            _ if in_scope => scope = Some(local),
            _ if in_type => lock_type = Some(local),
            _ => {}
          }
        }
      }
      Ok((resolve, Event::End(ref e))) => {
        if is_dav(&resolve) {
          match e.local_name().as_ref() {
            b"lockscope" => in_scope = false,
            b"locktype" => in_type = false,
            b"owner" => in_owner = false,
            _ => {}
          }
        }
      }
      Ok((_, Event::Text(ref t))) => {
        if in_owner {
          owner.push_str(
            &t.unescape()
              .map_err(|e| Error::InvalidXml(e.to_string()))?,
          );
        }
      }
      Ok((_, Event::Eof)) => break,
      Ok(_) => {}
      Err(e) => return Err(Error::InvalidXml(e.to_string())),
    }
    buf.clear();
  }

  match (scope, lock_type, owner.trim()) {
    (Some(scope), Some(lock_type), owner) if !owner.is_empty() => {
      Ok(LockRequest { scope, lock_type, owner: owner.to_owned() })
    }
    _ => Err(Error::BadRequest("invalid lock request body".into())),
  }
}

// ─── PROPPATCH request ───────────────────────────────────────────────────────

/// Property names touched by a propertyupdate body, in document order.
#[derive(Debug, Default, PartialEq)]
pub struct PropertyUpdate {
  pub set:    Vec<String>,
  pub remove: Vec<String>,
}

#[derive(PartialEq)]
enum UpdateMode {
  None,
  Set,
  Remove,
}

/// Parse a PROPPATCH `<propertyupdate>` body into the touched property
/// names. Only the names directly inside `<prop>` are recorded; nested
/// value markup belongs to the property and is skipped.
pub fn parse_proppatch(xml: &[u8]) -> Result<PropertyUpdate, Error> {
  if xml.is_empty() {
    return Err(Error::BadRequest("empty PROPPATCH body".into()));
  }

  let mut reader = NsReader::from_reader(xml);
  reader.config_mut().trim_text(true);

  let mut update = PropertyUpdate::default();
  let mut mode = UpdateMode::None;
  let mut prop_depth: Option<usize> = None;
  let mut depth = 0usize;
  let mut buf = Vec::new();

  loop {
    match reader.read_resolved_event_into(&mut buf) {
      Ok((resolve, Event::Start(ref e))) => {
        depth += 1;
        handle_update_element(
          &resolve, e, depth, &mut mode, &mut prop_depth, &mut update,
        );
      }
      Ok((resolve, Event::Empty(ref e))) => {
        handle_update_element(
          &resolve,
          e,
          depth + 1,
          &mut mode,
          &mut prop_depth,
          &mut update,
        );
      }
      Ok((resolve, Event::End(ref e))) => {
        if is_dav(&resolve) {
          match e.local_name().as_ref() {
            b"prop" => prop_depth = None,
            b"set" | b"remove" => mode = UpdateMode::None,
            _ => {}
          }
        }
        depth -= 1;
      }
      Ok((_, Event::Eof)) => break,
      Ok(_) => {}
      Err(e) => return Err(Error::InvalidXml(e.to_string())),
    }
    buf.clear();
  }

  Ok(update)
}

fn handle_update_element(
  resolve: &ResolveResult<'_>,
  e: &BytesStart<'_>,
  element_depth: usize,
  mode: &mut UpdateMode,
  prop_depth: &mut Option<usize>,
  update: &mut PropertyUpdate,
) {
  let local = local_of(e);
  if is_dav(resolve) {
    match local.as_str() {
      "set" => {
        *mode = UpdateMode::Set;
        return;
      }
      "remove" => {
        *mode = UpdateMode::Remove;
        return;
      }
      "prop" if *mode != UpdateMode::None => {
        *prop_depth = Some(element_depth);
        return;
      }
      _ => {}
    }
  }
  // A direct child of <prop>, whatever its namespace, is a property name.
  if let Some(d) = *prop_depth
    && element_depth == d + 1
  {
    match mode {
      UpdateMode::Set => update.set.push(local),
      UpdateMode::Remove => update.remove.push(local),
      UpdateMode::None => {}
    }
  }
}

// ─── Multistatus generation ──────────────────────────────────────────────────

/// One property inside a `<propstat>` block.
#[derive(Debug, Clone)]
pub enum Property {
  DisplayName(String),
  /// `<collection/>` inside `<resourcetype>` for directories, empty
  /// otherwise.
  ResourceType { collection: bool },
  /// RFC 1123 formatted.
  GetLastModified(String),
  /// Files only; collections omit it.
  GetContentLength(u64),
  /// An empty element echoing a property by name (PROPPATCH
  /// acknowledgments).
  Named(String),
}

pub struct MultistatusBuilder {
  writer: Writer<Cursor<Vec<u8>>>,
}

impl Default for MultistatusBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl MultistatusBuilder {
  pub fn new() -> Self {
    let cursor = Cursor::new(Vec::new());
    let mut writer = Writer::new(cursor);

    writer
      .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
      .unwrap();

    let mut ms = BytesStart::new("D:multistatus");
    ms.push_attribute(("xmlns:D", NS_DAV));
    writer.write_event(Event::Start(ms)).unwrap();

    Self { writer }
  }

  pub fn response(&mut self, href: &str) -> ResponseBuilder<'_> {
    ResponseBuilder { parent: self, href: href.to_owned() }
  }

  pub fn finish(mut self) -> Vec<u8> {
    self
      .writer
      .write_event(Event::End(BytesEnd::new("D:multistatus")))
      .unwrap();
    self.writer.into_inner().into_inner()
  }
}

pub struct ResponseBuilder<'a> {
  parent: &'a mut MultistatusBuilder,
  href:   String,
}

impl<'a> ResponseBuilder<'a> {
  pub fn propstat_ok(self, props: &[Property]) -> &'a mut MultistatusBuilder {
    let w = &mut self.parent.writer;

    write_start(w, "D:response");
    write_text_elem(w, "D:href", &self.href);
    write_start(w, "D:propstat");
    write_start(w, "D:prop");

    for prop in props {
      write_property(w, prop);
    }

    write_end(w, "D:prop");
    write_text_elem(w, "D:status", "HTTP/1.1 200 OK");
    write_end(w, "D:propstat");
    write_end(w, "D:response");

    self.parent
  }
}

// ─── Activelock generation ───────────────────────────────────────────────────

/// Serialize the `<lockdiscovery>` body returned by a successful LOCK.
pub fn activelock_body(lock: &ActiveLock, lock_type: &str) -> Vec<u8> {
  let cursor = Cursor::new(Vec::new());
  let mut w = Writer::new(cursor);

  w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
    .unwrap();

  let mut prop = BytesStart::new("D:prop");
  prop.push_attribute(("xmlns:D", NS_DAV));
  w.write_event(Event::Start(prop)).unwrap();

  write_start(&mut w, "D:lockdiscovery");
  write_start(&mut w, "D:activelock");

  write_start(&mut w, "D:locktype");
  write_empty(&mut w, &format!("D:{lock_type}"));
  write_end(&mut w, "D:locktype");

  write_start(&mut w, "D:lockscope");
  write_empty(&mut w, &format!("D:{}", lock.scope.local_name()));
  write_end(&mut w, "D:lockscope");

  write_text_elem(&mut w, "D:owner", &lock.owner);
  write_text_elem(&mut w, "D:timeout", &format!("Second-{}", crate::lock::LOCK_TTL_SECS));

  write_start(&mut w, "D:locktoken");
  write_text_elem(&mut w, "D:href", &format!("opaquelocktoken:{}", lock.token));
  write_end(&mut w, "D:locktoken");

  write_end(&mut w, "D:activelock");
  write_end(&mut w, "D:lockdiscovery");
  write_end(&mut w, "D:prop");

  w.into_inner().into_inner()
}

// ─── XML writer helpers ──────────────────────────────────────────────────────

fn write_start(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str) {
  w.write_event(Event::Start(BytesStart::new(tag))).unwrap();
}

fn write_end(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str) {
  w.write_event(Event::End(BytesEnd::new(tag))).unwrap();
}

fn write_empty(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str) {
  w.write_event(Event::Empty(BytesStart::new(tag))).unwrap();
}

fn write_text_elem(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) {
  write_start(w, tag);
  w.write_event(Event::Text(BytesText::new(text))).unwrap();
  write_end(w, tag);
}

fn write_property(w: &mut Writer<Cursor<Vec<u8>>>, prop: &Property) {
  match prop {
    Property::DisplayName(name) => write_text_elem(w, "D:displayname", name),
    Property::ResourceType { collection } => {
      if *collection {
        write_start(w, "D:resourcetype");
        write_empty(w, "D:collection");
        write_end(w, "D:resourcetype");
      } else {
        write_empty(w, "D:resourcetype");
      }
    }
    Property::GetLastModified(dt) => {
      write_text_elem(w, "D:getlastmodified", dt)
    }
    Property::GetContentLength(len) => {
      write_text_elem(w, "D:getcontentlength", &len.to_string())
    }
    Property::Named(name) => write_empty(w, name),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
