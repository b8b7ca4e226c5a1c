use clap::{Parser, Subcommand, ValueEnum};

use crate::xcom::packet::{ObjectType, PropertyId};

/// Xcom Bridge - talks to Studer installations through an Xcom-LAN gateway
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    #[clap(subcommand)]
    pub command: CommandArgs,
}

#[derive(Debug, Subcommand)]
pub enum CommandArgs {
    /// Read one property of a datapoint (id or name)
    Read {
        datapoint: String,

        #[clap(short, long, value_enum, default_value = "value")]
        property: PropertyArg,

        /// Defaults to the type the datapoint is registered as
        #[clap(short, long, value_enum)]
        object_type: Option<ObjectTypeArg>,

        #[clap(long)]
        json: bool,
    },

    /// Write a parameter
    Write {
        datapoint: String,
        value: String,

        /// Only change the RAM value, don't persist to flash
        #[clap(long)]
        unsaved: bool,
    },

    /// Read every known datapoint
    Dump {
        #[clap(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PropertyArg {
    Value,
    Min,
    Max,
    Level,
    Unsaved,
}

impl From<PropertyArg> for PropertyId {
    fn from(arg: PropertyArg) -> Self {
        match arg {
            PropertyArg::Value => PropertyId::Value,
            PropertyArg::Min => PropertyId::Min,
            PropertyArg::Max => PropertyId::Max,
            PropertyArg::Level => PropertyId::Level,
            PropertyArg::Unsaved => PropertyId::UnsavedValue,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ObjectTypeArg {
    Info,
    Parameter,
    Message,
    Datalog,
}

impl From<ObjectTypeArg> for ObjectType {
    fn from(arg: ObjectTypeArg) -> Self {
        match arg {
            ObjectTypeArg::Info => ObjectType::Info,
            ObjectTypeArg::Parameter => ObjectType::Parameter,
            ObjectTypeArg::Message => ObjectType::Message,
            ObjectTypeArg::Datalog => ObjectType::Datalog,
        }
    }
}

impl CommandArgs {
    pub fn json(&self) -> bool {
        match self {
            CommandArgs::Read { json, .. } | CommandArgs::Dump { json } => *json,
            CommandArgs::Write { .. } => false,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}
