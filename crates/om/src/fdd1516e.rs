//! FDD1516E dialect reader: the modern "child element" schema, where a
//! class's properties (`name`, `transportation`, `order`, `dimensions`, ...)
//! are nested child elements rather than attributes. Several tag names
//! recur under different parents with different meaning (`name`,
//! `sharing`, `semantics`, `dataType`, `transportation`, `order`,
//! `dimensions`, `dimension`); those dispatch on the current mode and fall
//! back to an unrecognized-but-accepted mode rather than erroring, matching
//! the permissive poor-man's-schema-checking of the original reader.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::builder::FomStringModuleBuilder;
use crate::error::OmError;
use crate::model::FomStringModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Unknown,
    ObjectModel,
    ModelIdentification,
    Objects,
    Interactions,
    Dimensions,
    Time,
    Tags,
    Synchronizations,
    Transportations,
    Switches,
    UpdateRates,
    DataTypes,
    Notes,

    ObjectClass,
    ObjectClassName,
    ObjectClassSharing,
    ObjectClassSemantics,
    ObjectClassAttribute,

    ObjectClassAttributeName,
    ObjectClassAttributeDataType,
    ObjectClassAttributeUpdateType,
    ObjectClassAttributeUpdateCondition,
    ObjectClassAttributeOwnership,
    ObjectClassAttributeSharing,
    ObjectClassAttributeTransportation,
    ObjectClassAttributeOrder,
    ObjectClassAttributeSemantics,
    ObjectClassAttributeDimensions,
    ObjectClassAttributeDimensionsDimension,

    InteractionClass,
    InteractionClassName,
    InteractionClassSharing,
    InteractionClassTransportation,
    InteractionClassOrder,
    InteractionClassSemantics,
    InteractionClassParameter,
    InteractionClassDimensions,

    InteractionClassParameterName,
    InteractionClassParameterDataType,
    InteractionClassParameterSemantics,

    InteractionClassDimensionsDimension,

    DimensionsDimension,
    DimensionsDimensionName,
    DimensionsDimensionDataType,
    DimensionsDimensionUpperBound,
    DimensionsDimensionNormalization,
    DimensionsDimensionValue,

    Transportation,
    TransportationName,
    TransportationReliable,
    TransportationSemantics,

    UpdateRate,
    UpdateRateName,
    UpdateRateRate,
}

struct State {
    modes: Vec<Mode>,
    characters: String,
}

impl State {
    fn current(&self) -> Mode {
        self.modes.last().copied().unwrap_or(Mode::Unknown)
    }
}

fn start_element(
    builder: &mut FomStringModuleBuilder,
    state: &State,
    name: &str,
) -> Result<Mode, OmError> {
    let mode = state.current();
    let mode = match name {
        "name" => match mode {
            Mode::ObjectClass => Mode::ObjectClassName,
            Mode::ObjectClassAttribute => Mode::ObjectClassAttributeName,
            Mode::InteractionClass => Mode::InteractionClassName,
            Mode::InteractionClassParameter => Mode::InteractionClassParameterName,
            Mode::DimensionsDimension => Mode::DimensionsDimensionName,
            Mode::Transportation => Mode::TransportationName,
            Mode::UpdateRate => Mode::UpdateRateName,
            _ => Mode::Unknown,
        },
        "sharing" => match mode {
            Mode::ObjectClass => Mode::ObjectClassSharing,
            Mode::ObjectClassAttribute => Mode::ObjectClassAttributeSharing,
            Mode::InteractionClass => Mode::InteractionClassSharing,
            _ => Mode::Unknown,
        },
        "semantics" => match mode {
            Mode::ObjectClass => Mode::ObjectClassSemantics,
            Mode::ObjectClassAttribute => Mode::ObjectClassAttributeSemantics,
            Mode::InteractionClass => Mode::InteractionClassSemantics,
            Mode::InteractionClassParameter => Mode::InteractionClassParameterSemantics,
            Mode::Transportation => Mode::TransportationSemantics,
            _ => Mode::Unknown,
        },
        "dataType" => match mode {
            Mode::ObjectClassAttribute => Mode::ObjectClassAttributeDataType,
            Mode::InteractionClassParameter => Mode::InteractionClassParameterDataType,
            Mode::DimensionsDimension => Mode::DimensionsDimensionDataType,
            _ => Mode::Unknown,
        },
        "transportation" => match mode {
            Mode::ObjectClassAttribute => Mode::ObjectClassAttributeTransportation,
            Mode::InteractionClass => Mode::InteractionClassTransportation,
            Mode::Transportations => {
                builder.add_transportation_type();
                Mode::Transportation
            }
            _ => Mode::Unknown,
        },
        "order" => match mode {
            Mode::ObjectClassAttribute => Mode::ObjectClassAttributeOrder,
            Mode::InteractionClass => Mode::InteractionClassOrder,
            _ => Mode::Unknown,
        },
        "dimensions" => match mode {
            Mode::ObjectClassAttribute => Mode::ObjectClassAttributeDimensions,
            Mode::InteractionClass => Mode::InteractionClassDimensions,
            Mode::ObjectModel => Mode::Dimensions,
            _ => Mode::Unknown,
        },
        "dimension" => match mode {
            Mode::ObjectClassAttributeDimensions => Mode::ObjectClassAttributeDimensionsDimension,
            Mode::InteractionClassDimensions => Mode::InteractionClassDimensionsDimension,
            Mode::Dimensions => {
                builder.add_dimension();
                Mode::DimensionsDimension
            }
            _ => Mode::Unknown,
        },

        "objectModel" => Mode::ObjectModel,
        "modelIdentification" => Mode::ModelIdentification,
        "objects" => {
            require(mode, Mode::ObjectModel, "objects tag outside objectModel!")?;
            Mode::Objects
        }
        "interactions" => {
            require(mode, Mode::ObjectModel, "interactions tag outside objectModel!")?;
            Mode::Interactions
        }
        "time" => {
            require(mode, Mode::ObjectModel, "time tag outside objectModel!")?;
            Mode::Time
        }
        "tags" => {
            require(mode, Mode::ObjectModel, "tags tag outside objectModel!")?;
            Mode::Tags
        }
        "synchronizations" => {
            require(mode, Mode::ObjectModel, "synchronizations tag outside objectModel!")?;
            Mode::Synchronizations
        }
        "transportations" => {
            require(mode, Mode::ObjectModel, "transportations tag outside objectModel!")?;
            Mode::Transportations
        }
        "switches" => {
            require(mode, Mode::ObjectModel, "switches tag outside objectModel!")?;
            Mode::Switches
        }
        "dataTypes" => {
            require(mode, Mode::ObjectModel, "dataTypes tag outside objectModel!")?;
            Mode::DataTypes
        }
        "notes" => {
            require(mode, Mode::ObjectModel, "notes tag outside objectModel!")?;
            Mode::Notes
        }
        "updateRates" => {
            require(mode, Mode::ObjectModel, "updateRates tag outside objectModel!")?;
            Mode::UpdateRates
        }
        "updateRate" => {
            require(mode, Mode::UpdateRates, "updateRates tag outside updateRates!")?;
            builder.add_update_rate();
            Mode::UpdateRate
        }
        "rate" => {
            require(mode, Mode::UpdateRate, "rate tag outside updateRate!")?;
            Mode::UpdateRateRate
        }
        "objectClass" => {
            if mode != Mode::Objects && mode != Mode::ObjectClass {
                return Err(OmError::reading_fdd("objectClass tag outside objectClass or objects!"));
            }
            builder.push_object_class();
            Mode::ObjectClass
        }
        "attribute" => {
            require(mode, Mode::ObjectClass, "attribute tag outside objectClass!")?;
            builder.add_attribute();
            Mode::ObjectClassAttribute
        }
        "updateType" => {
            require(mode, Mode::ObjectClassAttribute, "updateType tag outside attribute!")?;
            Mode::ObjectClassAttributeUpdateType
        }
        "updateCondition" => {
            require(mode, Mode::ObjectClassAttribute, "updateCondition tag outside attribute!")?;
            Mode::ObjectClassAttributeUpdateCondition
        }
        "ownership" => {
            require(mode, Mode::ObjectClassAttribute, "ownership tag outside attribute!")?;
            Mode::ObjectClassAttributeOwnership
        }
        "interactionClass" => {
            if mode != Mode::Interactions && mode != Mode::InteractionClass {
                return Err(OmError::reading_fdd(
                    "interactionClass tag outside interactionClass or interactions!",
                ));
            }
            builder.push_interaction_class();
            Mode::InteractionClass
        }
        "parameter" => {
            require(mode, Mode::InteractionClass, "parameter tag outside interactionClass!")?;
            builder.add_parameter();
            Mode::InteractionClassParameter
        }
        "upperBound" => {
            require(mode, Mode::DimensionsDimension, "upperBound tag outside dimension!")?;
            Mode::DimensionsDimensionUpperBound
        }
        "normalization" => {
            require(mode, Mode::DimensionsDimension, "normalization tag outside dimension!")?;
            Mode::DimensionsDimensionNormalization
        }
        "value" => {
            if mode != Mode::DimensionsDimension && mode != Mode::Unknown {
                return Err(OmError::reading_fdd("value tag outside dimension!"));
            }
            Mode::DimensionsDimensionValue
        }
        "reliable" => {
            require(mode, Mode::Transportation, "reliable tag outside transportation!")?;
            Mode::TransportationReliable
        }
        _ => Mode::Unknown,
    };
    Ok(mode)
}

fn require(mode: Mode, expected: Mode, message: &str) -> Result<(), OmError> {
    if mode != expected {
        return Err(OmError::reading_fdd(message));
    }
    Ok(())
}

fn end_element(builder: &mut FomStringModuleBuilder, closing: Mode, characters: &str) -> Result<(), OmError> {
    match closing {
        Mode::ObjectClassName => {
            if !builder.current_object_class().name.is_empty() {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate name tag for object class \"{characters}\"!"
                )));
            }
            builder.current_object_class().name.push(characters.to_string());
        }
        Mode::ObjectClassAttributeName => {
            let attribute = builder.current_object_class_attribute();
            if !attribute.name.is_empty() {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate name tag for object class attribute \"{}\"!",
                    attribute.name
                )));
            }
            attribute.name = characters.to_string();
        }
        Mode::InteractionClassName => {
            if !builder.current_interaction_class().name.is_empty() {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate name tag for interaction class \"{characters}\"!"
                )));
            }
            builder.current_interaction_class().name.push(characters.to_string());
        }
        Mode::InteractionClassParameterName => {
            let parameter = builder.current_interaction_class_parameter();
            if !parameter.name.is_empty() {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate name tag for interaction class parameter \"{}\"!",
                    parameter.name
                )));
            }
            parameter.name = characters.to_string();
        }
        Mode::DimensionsDimensionName => {
            let dimension = builder.current_dimension();
            if !dimension.name.is_empty() {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate name tag for dimension \"{}\"!",
                    dimension.name
                )));
            }
            dimension.name = characters.to_string();
        }
        Mode::TransportationName => {
            let transportation = builder.current_transportation_type();
            if !transportation.name.is_empty() {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate name tag for transportation \"{}\"!",
                    transportation.name
                )));
            }
            transportation.name = characters.to_string();
        }
        Mode::UpdateRateName => {
            let rate = builder.current_update_rate();
            if !rate.name.is_empty() {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate name tag for updateRate \"{}\"!",
                    rate.name
                )));
            }
            rate.name = characters.to_string();
        }
        Mode::ObjectClassAttributeTransportation => {
            builder.current_object_class_attribute().transportation_type = characters.to_string();
        }
        Mode::InteractionClassTransportation => {
            builder.current_interaction_class().transportation_type = characters.to_string();
        }
        Mode::UpdateRateRate => {
            builder.current_update_rate().rate = characters.trim().parse().unwrap_or(0.0);
        }
        Mode::ObjectClassAttributeOrder => {
            builder.current_object_class_attribute().order_type = characters.to_string();
        }
        Mode::InteractionClassOrder => {
            builder.current_interaction_class().order_type = characters.to_string();
        }
        Mode::ObjectClassAttributeDimensionsDimension => {
            builder.add_attribute_dimension(characters)?;
        }
        Mode::InteractionClassDimensionsDimension => {
            builder.add_interaction_dimension(characters)?;
        }
        Mode::DimensionsDimensionUpperBound => {
            builder.current_dimension().upper_bound = characters.trim().parse().unwrap_or(0);
        }
        Mode::ObjectClass => {
            if builder.current_object_class().name.len() != 1 {
                return Err(OmError::reading_fdd("No name given for object class!"));
            }
            if builder.current_object_class().name[0].is_empty() {
                return Err(OmError::reading_fdd("Empty name given for object class!"));
            }
            builder.pop_object_class();
        }
        Mode::ObjectClassAttribute => {
            if builder.current_object_class_attribute().name.is_empty() {
                return Err(OmError::reading_fdd("No or empty name given for object class attribute!"));
            }
        }
        Mode::InteractionClass => {
            if builder.current_interaction_class().name.len() != 1 {
                return Err(OmError::reading_fdd("No name given for interaction class!"));
            }
            if builder.current_interaction_class().name[0].is_empty() {
                return Err(OmError::reading_fdd("Empty name given for interaction class!"));
            }
            builder.pop_interaction_class();
        }
        Mode::InteractionClassParameter => {
            if builder.current_interaction_class_parameter().name.is_empty() {
                return Err(OmError::reading_fdd(
                    "No or empty name given for interaction class parameter!",
                ));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Parses an FDD1516E XML document, returning the canonical, validated module.
pub fn read(content: &str) -> Result<FomStringModule, OmError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut builder = FomStringModuleBuilder::new();
    let mut state = State { modes: Vec::new(), characters: String::new() };

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| OmError::Xml(e.to_string()))? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let mode = start_element(&mut builder, &state, &name)?;
                state.modes.push(mode);
                state.characters.clear();
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let mode = start_element(&mut builder, &state, &name)?;
                state.characters.clear();
                end_element(&mut builder, mode, "")?;
                state.characters.clear();
            }
            Event::Text(t) => {
                state.characters.push_str(&t.unescape().map_err(|e| OmError::Xml(e.to_string()))?);
            }
            Event::End(_) => {
                let mode = state.modes.pop().unwrap_or(Mode::Unknown);
                let text = std::mem::take(&mut state.characters);
                end_element(&mut builder, mode, &text)?;
                state.characters.clear();
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
        <dimensions>
            <dimension>
                <name>Space</name>
                <dataType>SpaceType</dataType>
                <upperBound>100</upperBound>
            </dimension>
        </dimensions>
        <transportations>
            <transportation>
                <name>HLAreliable</name>
                <reliable>Yes</reliable>
                <semantics>Reliable delivery</semantics>
            </transportation>
        </transportations>
        <updateRates>
            <updateRate>
                <name>Fast</name>
                <rate>10</rate>
            </updateRate>
        </updateRates>
        <objects>
            <objectClass>
                <name>Platform</name>
                <sharing>Neither</sharing>
                <attribute>
                    <name>Position</name>
                    <dataType>Vec3</dataType>
                    <updateType>Static</updateType>
                    <updateCondition>NA</updateCondition>
                    <ownership>NoTransfer</ownership>
                    <sharing>Neither</sharing>
                    <transportation>HLAreliable</transportation>
                    <order>TimeStamp</order>
                    <dimensions>
                        <dimension>Space</dimension>
                    </dimensions>
                </attribute>
            </objectClass>
        </objects>
        <interactions>
            <interactionClass>
                <name>Fire</name>
                <sharing>PublishSubscribe</sharing>
                <transportation>HLAreliable</transportation>
                <order>Receive</order>
                <parameter>
                    <name>Power</name>
                </parameter>
                <dimensions>
                    <dimension>Space</dimension>
                </dimensions>
            </interactionClass>
        </interactions>
    </objectModel>"#;

    #[test]
    fn reads_a_complete_object_model() {
        let module = read(DOCUMENT).unwrap();

        assert_eq!(module.dimensions.len(), 1);
        assert_eq!(module.dimensions[0].name, "Space");
        assert_eq!(module.dimensions[0].upper_bound, 100);

        assert_eq!(module.transportation_types.len(), 1);
        assert_eq!(module.transportation_types[0].name, "HLAreliable");

        assert_eq!(module.update_rates.len(), 1);
        assert_eq!(module.update_rates[0].name, "Fast");
        assert!((module.update_rates[0].rate - 10.0).abs() < f64::EPSILON);

        // HLAobjectRoot is synthesized as a parent since the document never
        // defines one (§4.10 step 5).
        assert!(module.artificial_object_root);
        let platform = module
            .object_classes
            .iter()
            .find(|c| c.name.last().map(String::as_str) == Some("Platform"))
            .unwrap();
        assert_eq!(platform.name, vec!["HLAobjectRoot".to_string(), "Platform".to_string()]);
        let position = platform.attributes.iter().find(|a| a.name == "Position").unwrap();
        assert_eq!(position.transportation_type, "HLAreliable");
        assert_eq!(position.order_type, "TimeStamp");
        assert_eq!(position.dimensions, vec!["Space".to_string()]);

        assert!(module.artificial_interaction_root);
        let fire = module
            .interaction_classes
            .iter()
            .find(|c| c.name.last().map(String::as_str) == Some("Fire"))
            .unwrap();
        assert_eq!(fire.name, vec!["HLAinteractionRoot".to_string(), "Fire".to_string()]);
        assert_eq!(fire.transportation_type, "HLAreliable");
        assert_eq!(fire.order_type, "Receive");
        assert_eq!(fire.parameters.len(), 1);
        assert_eq!(fire.parameters[0].name, "Power");
        assert_eq!(fire.dimensions, vec!["Space".to_string()]);
    }

    #[test]
    fn duplicate_name_tag_on_object_class_is_rejected() {
        let xml = r#"<objectModel><objects><objectClass>
            <name>A</name>
            <name>B</name>
        </objectClass></objects></objectModel>"#;
        assert!(matches!(read(xml), Err(OmError::ErrorReadingFdd(m)) if m.contains("Duplicate name")));
    }

    #[test]
    fn object_class_without_a_name_is_rejected() {
        let xml = r#"<objectModel><objects><objectClass>
            <attribute><name>X</name></attribute>
        </objectClass></objects></objectModel>"#;
        assert!(matches!(read(xml), Err(OmError::ErrorReadingFdd(m)) if m.contains("No name given for object class")));
    }

    #[test]
    fn unrecognized_tag_falls_back_to_unknown_mode_rather_than_erroring() {
        let xml = r#"<objectModel><someVendorExtension><foo/></someVendorExtension></objectModel>"#;
        assert!(read(xml).is_ok());
    }

    #[test]
    fn tag_outside_its_expected_parent_is_rejected() {
        let xml = r#"<objects/>"#;
        assert!(matches!(read(xml), Err(OmError::ErrorReadingFdd(m)) if m.contains("objects tag outside objectModel")));
    }
}
