mod common;
use common::*;
use xcom_bridge::prelude::*;

use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

async fn device_socket() -> UdpSocket {
    UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap()
}

async fn recv_request(device: &UdpSocket) -> Result<Frame> {
    let mut buf = [0u8; 256];
    let (len, _) = device.recv_from(&mut buf).await?;
    Ok(Frame::decode(&buf[..len])?)
}

#[tokio::test]
async fn reply_arrives_on_the_listening_port() {
    common_setup();

    let device = device_socket().await;
    let config = Factory::udp_config(device.local_addr().unwrap().port());
    let udp = UdpClient::bind(&config).await.unwrap();
    let reply_port = udp.reply_addr().unwrap().port();

    let sf = async {
        let mut client = Client::new(udp);

        let value = client.read_info(&datapoint::STATE_OF_CHARGE).await?;
        assert_eq!(value, Value::Float(50.0));
        assert_eq!(client.stats().packets_sent, 1);
        assert_eq!(client.stats().packets_received, 1);
        Ok::<(), anyhow::Error>(())
    };

    let tf = async {
        let mut buf = [0u8; 256];
        let (len, from) = device.recv_from(&mut buf).await?;
        // requests leave from a different socket than the one replies go to
        assert_ne!(from.port(), reply_port);

        let request = Frame::decode(&buf[..len])?;
        let reply = request.response_to(Some(Value::Float(50.0)));
        device.send_to(&reply.bytes()?, (Ipv4Addr::LOCALHOST, reply_port)).await?;
        Ok::<(), anyhow::Error>(())
    };

    futures::try_join!(tf, sf).unwrap();
}

#[tokio::test]
async fn silent_device_times_out() {
    common_setup();

    let device = device_socket().await;
    let config = Factory::udp_config(device.local_addr().unwrap().port());
    let udp = UdpClient::bind(&config).await.unwrap();

    let sf = async {
        let mut client = Client::new(udp);

        let err = client.read_info(&datapoint::PV_POWER).await.unwrap_err();
        assert!(matches!(err, Error::ResponseTimeout(_)), "{:?}", err);
        assert_eq!(client.stats().timeouts, 1);
        Ok::<(), anyhow::Error>(())
    };

    let tf = async {
        recv_request(&device).await?;
        Ok::<(), anyhow::Error>(())
    };

    futures::try_join!(tf, sf).unwrap();
}

#[tokio::test]
async fn garbage_reply_is_not_retried() {
    common_setup();

    let device = device_socket().await;
    let config = Factory::udp_config(device.local_addr().unwrap().port());
    let udp = UdpClient::bind(&config).await.unwrap();
    let reply_port = udp.reply_addr().unwrap().port();

    let sf = async {
        let mut client = Client::new(udp);

        let err = client.read_info(&datapoint::BATT_VOLTAGE).await.unwrap_err();
        assert!(err.is_framing(), "{:?}", err);
        assert_eq!(client.stats().packets_sent, 1);
        Ok::<(), anyhow::Error>(())
    };

    let tf = async {
        let request = recv_request(&device).await?;
        device
            .send_to(&Factory::corrupt_response(&request), (Ipv4Addr::LOCALHOST, reply_port))
            .await?;
        Ok::<(), anyhow::Error>(())
    };

    futures::try_join!(tf, sf).unwrap();
}

#[tokio::test]
async fn mismatched_reply_surfaces_to_the_caller() {
    common_setup();

    let device = device_socket().await;
    let config = Factory::udp_config(device.local_addr().unwrap().port());
    let udp = UdpClient::bind(&config).await.unwrap();
    let reply_port = udp.reply_addr().unwrap().port();

    let sf = async {
        let mut client = Client::new(udp);

        let err = client.read_info(&datapoint::BATT_CURRENT).await.unwrap_err();
        assert!(
            matches!(
                err,
                Error::UnexpectedResponse {
                    expected_object: 7001,
                    got_object: 7000,
                    ..
                }
            ),
            "{:?}",
            err
        );
        assert_eq!(client.stats().packets_sent, 1);
        Ok::<(), anyhow::Error>(())
    };

    let tf = async {
        recv_request(&device).await?;
        let reply = Factory::unrelated_response();
        device.send_to(&reply.bytes()?, (Ipv4Addr::LOCALHOST, reply_port)).await?;
        Ok::<(), anyhow::Error>(())
    };

    futures::try_join!(tf, sf).unwrap();
}

#[tokio::test]
async fn stale_reply_is_dropped_before_the_next_request() {
    common_setup();

    let device = device_socket().await;
    let config = Factory::udp_config(device.local_addr().unwrap().port());
    let udp = UdpClient::bind(&config).await.unwrap();
    let reply_port = udp.reply_addr().unwrap().port();

    // left over from an exchange that already gave up
    device
        .send_to(&Factory::unrelated_response().bytes().unwrap(), (Ipv4Addr::LOCALHOST, reply_port))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let sf = async {
        let mut client = Client::new(udp);

        let value = client.read_info(&datapoint::BATT_CURRENT).await?;
        assert_eq!(value, Value::Float(-3.5));
        assert_eq!(client.stats().packets_discarded, 1);
        Ok::<(), anyhow::Error>(())
    };

    let tf = async {
        let request = recv_request(&device).await?;
        let reply = request.response_to(Some(Value::Float(-3.5)));
        device.send_to(&reply.bytes()?, (Ipv4Addr::LOCALHOST, reply_port)).await?;
        Ok::<(), anyhow::Error>(())
    };

    futures::try_join!(tf, sf).unwrap();
}

#[tokio::test]
async fn bind_needs_a_host() {
    let mut config = Factory::udp_config(4002);
    config.host = None;

    assert!(UdpClient::bind(&config).await.is_err());
}

#[tokio::test]
async fn abandoned_exchange_stops_listening() {
    common_setup();

    let device = device_socket().await;
    let config = Factory::udp_config(device.local_addr().unwrap().port());
    let udp = UdpClient::bind(&config).await.unwrap();
    let reply_port = udp.reply_addr().unwrap().port();
    let mut client = Client::new(udp);

    // the caller gives up well inside the 300 ms reply window
    let abandoned = timeout(Duration::from_millis(50), client.read_info(&datapoint::PV_POWER)).await;
    assert!(abandoned.is_err());

    // its reply turns up late and must stay queued for the next drain
    let request = recv_request(&device).await.unwrap();
    let late = request.response_to(Some(Value::Float(2.0)));
    device
        .send_to(&late.bytes().unwrap(), (Ipv4Addr::LOCALHOST, reply_port))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sf = async {
        let value = client.read_info(&datapoint::BATT_CURRENT).await?;
        assert_eq!(value, Value::Float(-1.0));
        assert_eq!(client.stats().packets_discarded, 1);
        Ok::<(), anyhow::Error>(())
    };

    let tf = async {
        let request = recv_request(&device).await?;
        let reply = request.response_to(Some(Value::Float(-1.0)));
        device.send_to(&reply.bytes()?, (Ipv4Addr::LOCALHOST, reply_port)).await?;
        Ok::<(), anyhow::Error>(())
    };

    futures::try_join!(tf, sf).unwrap();
}

#[tokio::test]
async fn oversized_request_is_not_sent() {
    let device = device_socket().await;
    let config = Factory::udp_config(device.local_addr().unwrap().port());
    let mut udp = UdpClient::bind(&config).await.unwrap();

    let request = Frame::request(
        ServiceId::WriteProperty,
        ObjectType::Message,
        1,
        PropertyId::Value,
        Some(Value::Raw(vec![0; 65536])),
    );

    let err = udp.send_package(&request).await.unwrap_err();
    assert!(matches!(err, Error::FrameTooLarge { limit: 256, .. }), "{:?}", err);
    assert_eq!(udp.stats().packets_sent, 0);
}
