use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bridge_core::bus::{Bus, Message, topic_matches};
use bytes::Bytes;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

/// MQTT-backed bus. Broker publishes are forwarded into a broadcast channel
/// so any number of local subscriber tasks can consume them; broker-side
/// subscriptions are added per topic when `subscribe` is called.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    tx: Arc<broadcast::Sender<Message>>,
}

impl MqttBus {
    pub async fn connect(host: &str, port: u16, client_id: &str) -> Result<Self> {
        let mut opts = MqttOptions::new(client_id, host, port);
        opts.set_keep_alive(Duration::from_secs(5));
        opts.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(opts, 10);

        let (tx, _rx) = broadcast::channel(1024);
        let tx = Arc::new(tx);
        let forwarder_tx = Arc::clone(&tx);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::Publish(p))) => {
                        let _ = forwarder_tx.send(Message {
                            topic: p.topic,
                            payload: Bytes::from(p.payload.to_vec()),
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("mqtt event loop error: {e}");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                }
            }
        });

        Ok(Self { client, tx })
    }
}

#[async_trait]
impl Bus for MqttBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .context("publish mqtt message")?;
        Ok(())
    }

    async fn subscribe(
        &self,
        pattern: &str,
    ) -> Result<Box<dyn Stream<Item = Message> + Unpin + Send>> {
        self.client
            .subscribe(pattern, QoS::AtLeastOnce)
            .await
            .context("subscribe mqtt topic")?;

        let rx = self.tx.subscribe();
        let pattern = pattern.to_string();
        let stream = BroadcastStream::new(rx).filter_map(move |item| match item {
            Ok(msg) if topic_matches(&pattern, &msg.topic) => Some(msg),
            _ => None,
        });
        Ok(Box::new(stream))
    }
}
