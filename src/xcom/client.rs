use crate::error::{Error, Result};
use crate::xcom::datapoint::{AccessLevel, Datapoint, Registry, USER_LEVEL};
use crate::xcom::packet::{
    payload_kind, Frame, ObjectType, PropertyId, ServiceId, DEFAULT_DST_ADDR, DEFAULT_SRC_ADDR,
};
use crate::xcom::transport::{PacketStats, Transport};
use crate::xcom::value::Value;

use log::{debug, info};
use std::convert::TryFrom;

/// Turns property reads and writes into request/response exchanges over a
/// [`Transport`], and turns in-band device errors into [`Error::Protocol`].
pub struct Client<T: Transport> {
    transport: T,
    src_addr: u32,
    dst_addr: Option<u32>,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            src_addr: DEFAULT_SRC_ADDR,
            dst_addr: None,
        }
    }

    /// Source address, and a destination that overrides the per-datapoint default.
    pub fn with_addresses(mut self, src_addr: u32, dst_addr: Option<u32>) -> Self {
        self.src_addr = src_addr;
        self.dst_addr = dst_addr;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn stats(&self) -> &PacketStats {
        self.transport.stats()
    }

    /// One full exchange. Returns the response payload, which is `None` for an
    /// acknowledged write.
    pub async fn request(
        &mut self,
        service: ServiceId,
        object_type: ObjectType,
        object_id: u32,
        property: PropertyId,
        value: Option<Value>,
    ) -> Result<Option<Value>> {
        // the wire carries the kind the device expects, not the caller's
        let value = match (value, payload_kind(object_type, object_id, property)) {
            (Some(value), Some(kind)) => Some(value.coerce(kind)?),
            (value, _) => value,
        };

        let dst_addr = self.dst_addr.unwrap_or_else(|| Self::default_dst(object_id));
        let request = Frame::request(service, object_type, object_id, property, value)
            .with_addresses(self.src_addr, dst_addr);

        let response = self.transport.send_package(&request).await?;

        if let Some(code) = response.error_code {
            let reason = response.error_reason().unwrap_or("UNKNOWN_ERROR");
            info!(
                "{:?} of object {} failed: {} (0x{:04x})",
                service, object_id, reason, code
            );
            return Err(Error::Protocol { code, reason });
        }

        if !response.corresponds_to(&request) {
            return Err(Error::UnexpectedResponse {
                expected_service: request.service,
                expected_type: request.object_type,
                expected_object: request.object_id,
                got_service: response.service,
                got_type: response.object_type,
                got_object: response.object_id,
            });
        }

        debug!("{:?} of object {} -> {:?}", service, object_id, response.payload);
        Ok(response.payload)
    }

    pub async fn read_info(&mut self, datapoint: &Datapoint) -> Result<Value> {
        self.read(datapoint, ObjectType::Info, PropertyId::Value).await
    }

    pub async fn read_parameter(&mut self, datapoint: &Datapoint, property: PropertyId) -> Result<Value> {
        self.read(datapoint, ObjectType::Parameter, property).await
    }

    /// Reads the value through the object type the registry lists for it.
    pub async fn read_datapoint(&mut self, datapoint: &Datapoint) -> Result<Value> {
        self.read(datapoint, datapoint.object_type, PropertyId::Value).await
    }

    pub async fn read(
        &mut self,
        datapoint: &Datapoint,
        object_type: ObjectType,
        property: PropertyId,
    ) -> Result<Value> {
        let payload = self
            .request(ServiceId::ReadProperty, object_type, datapoint.id, property, None)
            .await?;

        // a successful read always carries data
        payload.ok_or(Error::MalformedValue {
            kind: datapoint.kind,
            expected: datapoint.kind.width(),
            actual: 0,
        })
    }

    /// Writes a parameter. `persist` selects the flash-backed value over the
    /// unsaved (RAM only) one.
    pub async fn write_parameter(&mut self, datapoint: &Datapoint, value: &Value, persist: bool) -> Result<()> {
        // fails before any I/O when the value doesn't fit
        let value = value.coerce(datapoint.kind)?;
        let property = if persist {
            PropertyId::Value
        } else {
            PropertyId::UnsavedValue
        };

        info!("Writing {} = {} ({:?})", datapoint.name, value, property);
        self.request(
            ServiceId::WriteProperty,
            ObjectType::Parameter,
            datapoint.id,
            property,
            Some(value),
        )
        .await?;

        Ok(())
    }

    /// The access level the installation is currently unlocked at.
    pub async fn read_user_level(&mut self) -> Result<Option<AccessLevel>> {
        let value = self.read_parameter(&USER_LEVEL, PropertyId::Value).await?;
        Ok(value
            .as_u16()
            .and_then(|raw| AccessLevel::try_from(raw).ok()))
    }

    fn default_dst(object_id: u32) -> u32 {
        Registry::lookup(object_id)
            .map(|d| d.device.address())
            .unwrap_or(DEFAULT_DST_ADDR)
    }
}
