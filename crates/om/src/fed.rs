//! FED dialect reader: a parenthesized, Lisp-like token stream (`(class
//! ...)`) rather than XML. [`tokenize`] ports the original's
//! character-at-a-time `ParenthesesReader` state machine into a single pass
//! that yields whole token lists per balanced `(...)` group; [`read`] then
//! drives the same builder calls the XML dialects do.

use crate::builder::FomStringModuleBuilder;
use crate::error::OmError;
use crate::model::FomStringModule;

/// One balanced `(...)` group's whitespace-delimited tokens, not including
/// the parentheses themselves. Nested groups appear as their own
/// [`Element`] when closed, interleaved in document order with their
/// parent's own tokens via [`TokenEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    /// `(` closed its token list: the tokens collected since the matching
    /// open, in order.
    Open(Vec<String>),
    /// The `)` matching the most recent still-open `Open`.
    Close,
}

struct Tokenizer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Tokenizer { chars: input.chars().peekable(), line: 1, column: 0 }
    }

    fn error(&self, message: impl Into<String>) -> OmError {
        OmError::reading_fdd(format!("{} at line {} column {}", message.into(), self.line, self.column))
    }
}

/// Ports `ParenthesesReader::parse`'s character state machine (`;;` line
/// comments, whitespace-delimited tokens, brace matching) into a flat
/// stream of [`TokenEvent`]s.
pub fn tokenize(input: &str) -> Result<Vec<TokenEvent>, OmError> {
    let mut tokenizer = Tokenizer::new(input);
    let mut events = Vec::new();

    let mut new_token = true;
    let mut allow_token = false;
    let mut token_list: Vec<String> = Vec::new();
    let mut current_token = String::new();
    let mut depth: usize = 0;

    let flush_token = |current_token: &mut String, token_list: &mut Vec<String>| {
        if !current_token.is_empty() {
            token_list.push(std::mem::take(current_token));
        }
    };

    while let Some(c) = tokenizer.chars.next() {
        match c {
            '(' => {
                flush_token(&mut current_token, &mut token_list);
                if allow_token {
                    if token_list.is_empty() {
                        return Err(tokenizer.error("Opening brace without any token before"));
                    }
                    events.push(TokenEvent::Open(std::mem::take(&mut token_list)));
                }
                depth += 1;
                new_token = true;
                allow_token = true;
                tokenizer.column += 1;
            }
            ')' => {
                flush_token(&mut current_token, &mut token_list);
                if !token_list.is_empty() {
                    events.push(TokenEvent::Open(std::mem::take(&mut token_list)));
                }
                if depth == 0 {
                    return Err(tokenizer.error("Closing brace without matching opening brace"));
                }
                depth -= 1;
                events.push(TokenEvent::Close);
                new_token = true;
                allow_token = false;
                tokenizer.column += 1;
            }
            '\n' => {
                flush_token(&mut current_token, &mut token_list);
                new_token = true;
                tokenizer.line += 1;
                tokenizer.column = 0;
            }
            '\r' => {
                flush_token(&mut current_token, &mut token_list);
                new_token = true;
                tokenizer.column = 0;
            }
            ' ' | '\t' => {
                flush_token(&mut current_token, &mut token_list);
                new_token = true;
                tokenizer.column += 1;
            }
            ';' => {
                if tokenizer.chars.peek() == Some(&';') {
                    tokenizer.chars.next();
                    for c in tokenizer.chars.by_ref() {
                        if c == '\n' {
                            tokenizer.line += 1;
                            tokenizer.column = 0;
                            break;
                        }
                    }
                } else {
                    if !allow_token {
                        return Err(tokenizer.error("Non whitespace character past closing brace"));
                    }
                    if new_token {
                        current_token.clear();
                        new_token = false;
                    }
                    current_token.push(';');
                    tokenizer.column += 1;
                }
            }
            other => {
                if !allow_token {
                    return Err(tokenizer.error("Non whitespace character past closing brace"));
                }
                if new_token {
                    current_token.clear();
                    new_token = false;
                }
                current_token.push(other);
                tokenizer.column += 1;
            }
        }
    }

    flush_token(&mut current_token, &mut token_list);
    if !token_list.is_empty() {
        events.push(TokenEvent::Open(token_list));
    }
    if depth != 0 {
        return Err(tokenizer.error("Unbalanced parentheses"));
    }

    Ok(events)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Unknown,
    Fed,
    Federation,
    FedVersion,
    Spaces,
    Space,
    Dimension,
    Objects,
    ObjectClass,
    Attribute,
    Interactions,
    InteractionClass,
    Parameter,
}

fn case_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn normalize_transportation_type(name: &str) -> String {
    if case_eq(name, "reliable") {
        "HLAreliable".to_string()
    } else if case_eq(name, "best_effort") {
        "HLAbestEffort".to_string()
    } else {
        name.to_string()
    }
}

/// The original always normalizes to `TimeStamp` unless the token is
/// exactly `receive`, "probably safer" per its own comment: any unexpected
/// order keyword silently becomes time-stamp order rather than erroring.
fn normalize_order_type(name: &str) -> String {
    if case_eq(name, "receive") {
        "Receive".to_string()
    } else {
        "TimeStamp".to_string()
    }
}

fn normalize_interaction_class_name(name: &str) -> String {
    if case_eq(name, "InteractionRoot") {
        "HLAinteractionRoot".to_string()
    } else {
        name.to_string()
    }
}

fn normalize_object_class_name(name: &str) -> String {
    if case_eq(name, "ObjectRoot") {
        "HLAobjectRoot".to_string()
    } else {
        name.to_string()
    }
}

fn normalize_object_class_attribute_name(name: &str) -> String {
    if case_eq(name, "privilegeToDelete") {
        "HLAprivilegeToDeleteObject".to_string()
    } else {
        name.to_string()
    }
}

fn start_element(
    builder: &mut FomStringModuleBuilder,
    modes: &[Mode],
    tokens: &[String],
) -> Result<Mode, OmError> {
    let mode = modes.last().copied().unwrap_or(Mode::Unknown);
    let head = tokens.first().map(String::as_str).unwrap_or_default();

    if case_eq(head, "FED") {
        if mode != Mode::Unknown {
            return Err(OmError::reading_fdd("FED section only allowed at top level!"));
        }
        if tokens.len() != 1 {
            return Err(OmError::reading_fdd("FED section takes no arguments!"));
        }
        return Ok(Mode::Fed);
    }
    if case_eq(head, "Federation") {
        if mode != Mode::Fed {
            return Err(OmError::reading_fdd("Federation tag only allowed in FED section!"));
        }
        if tokens.len() != 2 {
            return Err(OmError::reading_fdd("Federation tag needs exactly one name argument!"));
        }
        return Ok(Mode::Federation);
    }
    if case_eq(head, "FEDversion") {
        if mode != Mode::Fed {
            return Err(OmError::reading_fdd("FEDversion tag only allowed in FED section!"));
        }
        if tokens.len() != 2 {
            return Err(OmError::reading_fdd("FEDversion tag needs exactly one version argument!"));
        }
        let version = &tokens[1];
        let known = ["1.3", "v1.3", "1_3", "v1_3"];
        if !known.iter().any(|v| case_eq(v, version)) {
            return Err(OmError::reading_fdd(format!("Unknown FED version \"{version}\"!")));
        }
        return Ok(Mode::FedVersion);
    }
    if case_eq(head, "spaces") {
        if mode != Mode::Fed {
            return Err(OmError::reading_fdd("spaces tag only allowed in FED section!"));
        }
        return Ok(Mode::Spaces);
    }
    if case_eq(head, "space") {
        if mode != Mode::Spaces {
            return Err(OmError::reading_fdd("space tag only allowed in spaces section!"));
        }
        if tokens.len() != 2 {
            return Err(OmError::reading_fdd("space tag needs exactly one name argument!"));
        }
        return Ok(Mode::Space);
    }
    if case_eq(head, "dimension") {
        if mode != Mode::Space {
            return Err(OmError::reading_fdd("dimension tag only allowed in space section!"));
        }
        if tokens.len() != 2 {
            return Err(OmError::reading_fdd("dimension tag needs exactly one name argument!"));
        }
        builder.add_dimension();
        builder.current_dimension().name = tokens[1].clone();
        return Ok(Mode::Dimension);
    }
    if case_eq(head, "objects") {
        if mode != Mode::Fed {
            return Err(OmError::reading_fdd("objects tag only allowed in FED section!"));
        }
        return Ok(Mode::Objects);
    }
    if case_eq(head, "interactions") {
        if mode != Mode::Fed {
            return Err(OmError::reading_fdd("interactions tag only allowed in FED section!"));
        }
        return Ok(Mode::Interactions);
    }
    if case_eq(head, "class") {
        match mode {
            Mode::Objects | Mode::ObjectClass => {
                if tokens.len() != 2 {
                    return Err(OmError::reading_fdd("object class needs exactly one name argument!"));
                }
                builder.push_object_class();
                builder
                    .current_object_class()
                    .name
                    .push(normalize_object_class_name(&tokens[1]));
                return Ok(Mode::ObjectClass);
            }
            Mode::Interactions | Mode::InteractionClass => {
                if tokens.len() != 4 && tokens.len() != 5 {
                    return Err(OmError::reading_fdd(
                        "interaction class needs name, transportation and order arguments!",
                    ));
                }
                builder.push_interaction_class();
                let class = builder.current_interaction_class();
                class.name.push(normalize_interaction_class_name(&tokens[1]));
                class.transportation_type = normalize_transportation_type(&tokens[2]);
                class.order_type = normalize_order_type(&tokens[3]);
                return Ok(Mode::InteractionClass);
            }
            _ => {
                return Err(OmError::reading_fdd(
                    "class only allowed in object class or interaction class definitions!",
                ));
            }
        }
    }
    if case_eq(head, "attribute") {
        if mode != Mode::ObjectClass {
            return Err(OmError::reading_fdd("attribute only allowed in object class definitions!"));
        }
        if tokens.len() != 4 && tokens.len() != 5 {
            return Err(OmError::reading_fdd(
                "attribute needs name, transportation and order arguments!",
            ));
        }
        builder.add_attribute();
        let attribute = builder.current_object_class_attribute();
        attribute.name = normalize_object_class_attribute_name(&tokens[1]);
        attribute.transportation_type = normalize_transportation_type(&tokens[2]);
        attribute.order_type = normalize_order_type(&tokens[3]);
        return Ok(Mode::Attribute);
    }
    if case_eq(head, "parameter") {
        if mode != Mode::InteractionClass {
            return Err(OmError::reading_fdd("parameter only allowed in interaction class definitions!"));
        }
        if tokens.len() != 2 {
            return Err(OmError::reading_fdd("parameter tag needs exactly one name argument!"));
        }
        builder.add_parameter();
        builder.current_interaction_class_parameter().name = tokens[1].clone();
        return Ok(Mode::Parameter);
    }

    Ok(Mode::Unknown)
}

fn end_element(builder: &mut FomStringModuleBuilder, mode: Mode) {
    match mode {
        Mode::ObjectClass => builder.pop_object_class(),
        Mode::InteractionClass => builder.pop_interaction_class(),
        _ => {}
    }
}

/// Parses a FED document, returning the canonical, validated module.
pub fn read(content: &str) -> Result<FomStringModule, OmError> {
    let events = tokenize(content)?;

    let mut builder = FomStringModuleBuilder::new();
    // The two transportation types FED files never declare explicitly but
    // every FED class may reference (`reliable`/`best_effort`, normalized).
    builder.add_transportation_type();
    builder.current_transportation_type().name = normalize_transportation_type("reliable");
    builder.add_transportation_type();
    builder.current_transportation_type().name = normalize_transportation_type("best_effort");

    let mut modes: Vec<Mode> = Vec::new();
    for event in events {
        match event {
            TokenEvent::Open(tokens) => {
                let mode = start_element(&mut builder, &modes, &tokens)?;
                modes.push(mode);
            }
            TokenEvent::Close => {
                let mode = modes.pop().unwrap_or(Mode::Unknown);
                end_element(&mut builder, mode);
            }
        }
    }

    builder.validate()?;
    Ok(builder.into_module())
}
