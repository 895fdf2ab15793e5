//! FDD1516 dialect reader: object/interaction classes are nested `<objectClass
//! name="...">`/`<interactionClass name="...">` elements whose own properties
//! (`order`, `transportation`, `dimensions`) live in attributes rather than
//! child elements. This is the oldest and simplest of the three dialects.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::builder::FomStringModuleBuilder;
use crate::error::OmError;
use crate::model::FomStringModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Unknown,
    ObjectModel,
    Objects,
    ObjectClass,
    Attribute,
    Interactions,
    InteractionClass,
    Parameter,
    Dimensions,
    Dimension,
    Transportations,
    Transportation,
    Other,
}

fn attr(e: &quick_xml::events::BytesStart, key: &str) -> String {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .map(|a| String::from_utf8_lossy(&a.value).trim().to_string())
        .unwrap_or_default()
}

fn split_dimensions(value: &str) -> Vec<String> {
    value
        .split([',', ' ', '\t', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "NA")
        .map(str::to_string)
        .collect()
}

fn start_element(
    builder: &mut FomStringModuleBuilder,
    modes: &[Mode],
    e: &quick_xml::events::BytesStart,
) -> Result<Mode, OmError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mode = modes.last().copied().unwrap_or(Mode::Unknown);
    match name.as_str() {
        "attribute" => {
            if mode != Mode::ObjectClass {
                return Err(OmError::reading_fdd("attribute tag outside objectClass!"));
            }
            builder.add_attribute();
            let attribute = builder.current_object_class_attribute();
            attribute.name = attr(e, "name");
            attribute.order_type = attr(e, "order");
            attribute.transportation_type = attr(e, "transportation");
            let dims = split_dimensions(&attr(e, "dimensions"));
            for dim in dims {
                builder.add_attribute_dimension(&dim)?;
            }
            Ok(Mode::Attribute)
        }
        "objectClass" => {
            if mode != Mode::Objects && mode != Mode::ObjectClass {
                return Err(OmError::reading_fdd("objectClass tag outside objectClass or objects!"));
            }
            builder.push_object_class();
            builder.current_object_class().name.push(attr(e, "name"));
            Ok(Mode::ObjectClass)
        }
        "objects" => {
            if mode != Mode::ObjectModel {
                return Err(OmError::reading_fdd("objects tag outside objectModel!"));
            }
            Ok(Mode::Objects)
        }
        "parameter" => {
            if mode != Mode::InteractionClass {
                return Err(OmError::reading_fdd("parameter tag outside interactionClass!"));
            }
            builder.add_parameter();
            builder.current_interaction_class_parameter().name = attr(e, "name");
            Ok(Mode::Parameter)
        }
        "interactionClass" => {
            if mode != Mode::Interactions && mode != Mode::InteractionClass {
                return Err(OmError::reading_fdd(
                    "interactionClass tag outside interactions or interactionClass!",
                ));
            }
            builder.push_interaction_class();
            {
                let class = builder.current_interaction_class();
                class.name.push(attr(e, "name"));
                class.order_type = attr(e, "order");
                class.transportation_type = attr(e, "transportation");
            }
            let dims = split_dimensions(&attr(e, "dimensions"));
            for dim in dims {
                builder.add_interaction_dimension(&dim)?;
            }
            Ok(Mode::InteractionClass)
        }
        "interactions" => {
            if mode != Mode::ObjectModel {
                return Err(OmError::reading_fdd("interactions tag outside objectModel!"));
            }
            Ok(Mode::Interactions)
        }
        "dimensions" => {
            if mode != Mode::ObjectModel {
                return Err(OmError::reading_fdd("dimensions tag outside objectModel!"));
            }
            Ok(Mode::Dimensions)
        }
        "dimension" => {
            if mode != Mode::Dimensions {
                return Err(OmError::reading_fdd("dimension tag outside dimensions!"));
            }
            builder.add_dimension();
            let dimension = builder.current_dimension();
            dimension.name = attr(e, "name");
            dimension.upper_bound = attr(e, "upperBound").parse().unwrap_or(0);
            Ok(Mode::Dimension)
        }
        "transportation" => {
            if mode != Mode::Transportations {
                return Err(OmError::reading_fdd("transportation tag outside transportations!"));
            }
            builder.add_transportation_type();
            builder.current_transportation_type().name = attr(e, "name");
            Ok(Mode::Transportation)
        }
        "transportations" => {
            if mode != Mode::ObjectModel {
                return Err(OmError::reading_fdd("transportations tag outside objectModel!"));
            }
            Ok(Mode::Transportations)
        }
        "objectModel" => {
            if !modes.is_empty() {
                return Err(OmError::reading_fdd("objectModel tag not at top level!"));
            }
            Ok(Mode::ObjectModel)
        }
        // Data-type / notes / synchronizations / switches / updateRates subtrees
        // carry no object-class-relevant information in this dialect and are
        // accepted but otherwise ignored, matching the permissive fallthrough
        // for any other element.
        _ => Ok(Mode::Other),
    }
}

fn end_element(builder: &mut FomStringModuleBuilder, mode: Mode) {
    match mode {
        Mode::ObjectClass => builder.pop_object_class(),
        Mode::InteractionClass => builder.pop_interaction_class(),
        _ => {}
    }
}

/// Parses an FDD1516 XML document, returning the canonical, validated module.
pub fn read(content: &str) -> Result<FomStringModule, OmError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut builder = FomStringModuleBuilder::new();
    let mut modes: Vec<Mode> = Vec::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| OmError::Xml(e.to_string()))? {
            Event::Eof => break,
            Event::Start(e) => {
                let mode = start_element(&mut builder, &modes, &e)?;
                modes.push(mode);
            }
            Event::Empty(e) => {
                let mode = start_element(&mut builder, &modes, &e)?;
                end_element(&mut builder, mode);
            }
            Event::End(_) => {
                if let Some(mode) = modes.pop() {
                    end_element(&mut builder, mode);
                }
            }
            _ => {}
        }
        buf.clear();
    }

    builder.validate()?;
    Ok(builder.into_module())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<objectModel>
        <transportations>
            <transportation name="HLAreliable"/>
        </transportations>
        <dimensions>
            <dimension name="Space" upperBound="100"/>
        </dimensions>
        <objects>
            <objectClass name="Platform">
                <attribute name="Position" order="TimeStamp" transportation="HLAreliable" dimensions="Space"/>
            </objectClass>
        </objects>
        <interactions>
            <interactionClass name="Fire" order="Receive" transportation="HLAreliable" dimensions="Space">
                <parameter name="Power"/>
            </interactionClass>
        </interactions>
    </objectModel>"#;

    #[test]
    fn reads_a_complete_object_model() {
        let module = read(DOCUMENT).unwrap();

        assert_eq!(module.transportation_types.len(), 1);
        assert_eq!(module.transportation_types[0].name, "HLAreliable");

        assert_eq!(module.dimensions.len(), 1);
        assert_eq!(module.dimensions[0].name, "Space");
        assert_eq!(module.dimensions[0].upper_bound, 100);

        assert!(module.artificial_object_root);
        let platform = module
            .object_classes
            .iter()
            .find(|c| c.name.last().map(String::as_str) == Some("Platform"))
            .unwrap();
        assert_eq!(platform.name, vec!["HLAobjectRoot".to_string(), "Platform".to_string()]);
        let position = platform.attributes.iter().find(|a| a.name == "Position").unwrap();
        assert_eq!(position.order_type, "TimeStamp");
        assert_eq!(position.transportation_type, "HLAreliable");
        assert_eq!(position.dimensions, vec!["Space".to_string()]);

        assert!(module.artificial_interaction_root);
        let fire = module
            .interaction_classes
            .iter()
            .find(|c| c.name.last().map(String::as_str) == Some("Fire"))
            .unwrap();
        assert_eq!(fire.name, vec!["HLAinteractionRoot".to_string(), "Fire".to_string()]);
        assert_eq!(fire.parameters.len(), 1);
        assert_eq!(fire.parameters[0].name, "Power");
        assert_eq!(fire.dimensions, vec!["Space".to_string()]);
    }

    #[test]
    fn dimensions_attribute_ignores_na_and_separators() {
        let xml = r#"<objectModel><dimensions><dimension name="Space" upperBound="1"/></dimensions>
            <objects><objectClass name="Platform">
                <attribute name="Position" dimensions="Space, NA"/>
            </objectClass></objects></objectModel>"#;
        let module = read(xml).unwrap();
        let platform = module.object_classes.iter().find(|c| c.attributes.iter().any(|a| a.name == "Position")).unwrap();
        let attribute = platform.attributes.iter().find(|a| a.name == "Position").unwrap();
        assert_eq!(attribute.dimensions, vec!["Space".to_string()]);
    }

    #[test]
    fn attribute_outside_object_class_is_rejected() {
        let xml = r#"<objectModel><objects><attribute name="X"/></objects></objectModel>"#;
        assert!(matches!(read(xml), Err(OmError::ErrorReadingFdd(m)) if m.contains("attribute tag outside objectClass")));
    }

    #[test]
    fn objectmodel_not_at_top_level_is_rejected() {
        let xml = r#"<wrapper><objectModel/></wrapper>"#;
        assert!(matches!(read(xml), Err(OmError::ErrorReadingFdd(m)) if m.contains("objectModel tag not at top level")));
    }

    #[test]
    fn unrecognized_tag_falls_back_to_other_mode_rather_than_erroring() {
        let xml = r#"<objectModel><notes><note/></notes></objectModel>"#;
        assert!(read(xml).is_ok());
    }
}
