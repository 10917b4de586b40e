#[taskrun_status_test::test(cluster)]
fn cluster_required() -> Result<(), ()> {
  log::info!("talking to the cluster");
  log::trace!("kubectl answered");

  Ok(())
}

#[taskrun_status_test::test]
async fn async_body_runs_on_tokio() -> Result<(), ()> {
  let handle = tokio::spawn(async { 21 * 2 });
  let answer = handle.await.map_err(|_| ())?;

  log::debug!("answer = {}", answer);
  assert_eq!(answer, 42);

  Ok(())
}

#[taskrun_status_test::test]
fn sync_body_logs() {
  log::warn!("sync tests get the logger too");
  assert!(log::max_level() >= log::LevelFilter::Debug);
}

#[taskrun_status_test::test]
#[should_panic(expected = "kept")]
fn extra_attributes_are_kept() {
  panic!("kept");
}
