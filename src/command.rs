use crate::prelude::*;

use crate::options::CommandArgs;
use crate::xcom::datapoint::{enum_label, Datapoint, Registry};
use crate::xcom::packet::{ObjectType, PropertyId, ServiceId};
use crate::xcom::value::Value;
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum Command {
    Read {
        object_id: u32,
        datapoint: Option<&'static Datapoint>,
        object_type: ObjectType,
        property: PropertyId,
    },
    Write {
        datapoint: &'static Datapoint,
        value: Value,
        persist: bool,
    },
    Dump,
}

/// One line of command output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub id: u32,
    pub name: Option<&'static str>,
    pub property: PropertyId,
    pub value: Option<Value>,
    pub label: Option<String>,
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name.unwrap_or("UNKNOWN"), self.id)?;
        if self.property != PropertyId::Value {
            write!(f, " {:?}", self.property)?;
        }
        match (&self.value, &self.label) {
            (Some(value), Some(label)) => write!(f, " = {} ({})", value, label),
            (Some(value), None) => write!(f, " = {}", value),
            (None, _) => write!(f, " = -"),
        }
    }
}

impl Reading {
    fn new(id: u32, datapoint: Option<&'static Datapoint>, property: PropertyId, value: Option<Value>) -> Self {
        let label = match (datapoint, &value) {
            (Some(d), Some(v)) if property == PropertyId::Value || property == PropertyId::UnsavedValue => {
                enum_label(d, v)
            }
            _ => None,
        };

        Self {
            id,
            name: datapoint.map(|d| d.name),
            property,
            value,
            label,
        }
    }
}

impl Command {
    pub fn from_args(args: &CommandArgs) -> Result<Self> {
        let command = match args {
            CommandArgs::Read {
                datapoint,
                property,
                object_type,
                ..
            } => {
                let known = Registry::resolve(datapoint);
                let object_id = match (known, datapoint.parse::<u32>()) {
                    (Some(d), _) => d.id,
                    (None, Ok(id)) => id,
                    (None, Err(_)) => bail!("unknown datapoint {}", datapoint),
                };
                let object_type = match (object_type, known) {
                    (Some(t), _) => ObjectType::from(*t),
                    (None, Some(d)) => d.object_type,
                    (None, None) => bail!("datapoint {} is not registered, pass --object-type", object_id),
                };

                Command::Read {
                    object_id,
                    datapoint: known,
                    object_type,
                    property: PropertyId::from(*property),
                }
            }
            CommandArgs::Write {
                datapoint,
                value,
                unsaved,
            } => {
                let datapoint = Registry::resolve(datapoint)
                    .ok_or_else(|| anyhow!("unknown datapoint {}, can't tell its type", datapoint))?;
                if datapoint.object_type != ObjectType::Parameter {
                    bail!("{} is read-only (not a parameter)", datapoint.name);
                }

                Command::Write {
                    datapoint,
                    value: Value::parse(datapoint.kind, value)?,
                    persist: !unsaved,
                }
            }
            CommandArgs::Dump { .. } => Command::Dump,
        };

        Ok(command)
    }

    pub async fn run<T: Transport>(&self, client: &mut Client<T>) -> Result<Vec<Reading>> {
        match self {
            Command::Read {
                object_id,
                datapoint,
                object_type,
                property,
            } => {
                let value = client
                    .request(ServiceId::ReadProperty, *object_type, *object_id, *property, None)
                    .await?;
                Ok(vec![Reading::new(*object_id, *datapoint, *property, value)])
            }
            Command::Write {
                datapoint,
                value,
                persist,
            } => {
                client.write_parameter(datapoint, value, *persist).await?;
                let property = if *persist {
                    PropertyId::Value
                } else {
                    PropertyId::UnsavedValue
                };
                Ok(vec![Reading::new(datapoint.id, Some(*datapoint), property, Some(value.clone()))])
            }
            Command::Dump => {
                let mut readings = Vec::new();
                for datapoint in Registry::all() {
                    match client.read_datapoint(datapoint).await {
                        Ok(value) => {
                            readings.push(Reading::new(datapoint.id, Some(datapoint), PropertyId::Value, Some(value)))
                        }
                        Err(e) => {
                            warn!("{} ({}): {}", datapoint.name, datapoint.id, e);
                            readings.push(Reading::new(datapoint.id, Some(datapoint), PropertyId::Value, None));
                        }
                    }
                }
                Ok(readings)
            }
        }
    }
}
