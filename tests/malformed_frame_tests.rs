use battleship_bus::transport::tcp::{encode_frame, Frame, MAX_FRAME_SIZE};
use battleship_bus::{Inbound, TcpTransport, Transport};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::time::Duration;

/// Accept one client, write `bytes` to it, then hold the socket briefly.
async fn serve_bytes(bytes: Vec<u8>) -> anyhow::Result<(TcpTransport, tokio::task::JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(&bytes).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    });
    let transport = TcpTransport::connect(addr).await?;
    Ok((transport, server))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_length_prefix() -> anyhow::Result<()> {
    let (mut transport, server) = serve_bytes(vec![0xFF, 0xFF, 0xFF, 0xFF]).await?;
    let err = transport.recv().await.unwrap_err().to_string();
    assert!(err.contains("too large"), "unexpected error: {err}");
    server.await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zero_length_frame() -> anyhow::Result<()> {
    let (mut transport, server) = serve_bytes(vec![0, 0, 0, 0]).await?;
    let err = transport.recv().await.unwrap_err().to_string();
    assert!(err.contains("length: 0"), "unexpected error: {err}");
    server.await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_garbage_body() -> anyhow::Result<()> {
    let mut bytes = 4u32.to_be_bytes().to_vec();
    bytes.extend([0xDE, 0xAD, 0xBE, 0xEF]);
    let (mut transport, server) = serve_bytes(bytes).await?;
    let err = transport.recv().await.unwrap_err().to_string();
    assert!(err.contains("Deserialization"), "unexpected error: {err}");
    server.await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_truncated_frame_then_close() -> anyhow::Result<()> {
    let frame = encode_frame(
        &Frame::Deliver(Inbound {
            topic: "t".into(),
            payload: "skip".into(),
        }),
        MAX_FRAME_SIZE,
    )?;
    let (mut transport, server) = serve_bytes(frame[..frame.len() - 2].to_vec()).await?;
    let err = transport.recv().await.unwrap_err().to_string();
    assert!(err.contains("closed"), "unexpected error: {err}");
    server.await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_client_frame_from_broker_is_rejected() -> anyhow::Result<()> {
    let frame = encode_frame(&Frame::Subscribe { topic: "t".into() }, MAX_FRAME_SIZE)?;
    let (mut transport, server) = serve_bytes(frame).await?;
    let err = transport.recv().await.unwrap_err().to_string();
    assert!(err.contains("Unexpected frame"), "unexpected error: {err}");
    server.await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_back_to_back_frames() -> anyhow::Result<()> {
    let mut bytes = Vec::new();
    for payload in ["f|1", "f|2"] {
        bytes.extend(encode_frame(
            &Frame::Deliver(Inbound {
                topic: "d".into(),
                payload: payload.into(),
            }),
            MAX_FRAME_SIZE,
        )?);
    }
    let (mut transport, server) = serve_bytes(bytes).await?;
    assert_eq!(transport.recv().await?.payload, "f|1");
    assert_eq!(transport.recv().await?.payload, "f|2");
    server.await?;
    Ok(())
}
